use crate::config::store::ConfigStore;
use crate::error::Result;
use crate::instances::registry::InstanceRegistry;
use crate::traits::AppContext;
use crate::ui as output;

pub fn show(ctx: &AppContext, instance: &str) -> Result<()> {
    let id = InstanceRegistry::load(&ctx.paths)?.resolve(instance)?.id.clone();
    let doc = ConfigStore::new(ctx.paths.clone()).configuration(&id)?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

pub fn touch(ctx: &AppContext, instance: &str) -> Result<()> {
    let id = InstanceRegistry::load(&ctx.paths)?.resolve(instance)?.id.clone();
    ConfigStore::new(ctx.paths.clone()).touch(&id)?;
    output::success(&format!("Rewrote config of '{}'", id));
    Ok(())
}
