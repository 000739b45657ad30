//! Behavioral capability probe.
//!
//! The plugin's package directory is loaded by a `node` child process
//! running a small harness, so `main` resolves the way the runtime
//! resolves it. The harness hands the module's initializer a fake runtime
//! whose only effective calls are `registerPlatform` and `registerAccessory`,
//! then prints the recorded aliases as one JSON array. Every probe gets a
//! fresh process, so no module cache outlives it.

use super::{CapabilityKind, CapabilityRecord};
use crate::error::{HubError, Result};
use crate::packages::manifest::PluginRecord;
use crate::utils::command_exec;
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;

const NODE_PROGRAM: &str = "node";

const HARNESS: &str = r#"
const target = process.argv[process.argv.length - 1];
const found = [];
const record = (type) => (...args) => {
  const alias = typeof args[1] === 'string' ? args[1] : args[0];
  if (typeof alias === 'string' && alias.length > 0) found.push({ alias, type });
};
const stub = new Proxy(function () {}, {
  get: (_, key) => (key === Symbol.toPrimitive ? () => '' : stub),
  apply: () => stub,
  construct: () => stub,
});
const api = {
  version: 2.7,
  serverVersion: '0.0.0',
  hap: stub,
  platformAccessory: stub,
  user: {
    storagePath: () => '',
    configPath: () => '',
    persistPath: () => '',
    cachedAccessoryPath: () => '',
  },
  versionGreaterOrEqual: () => true,
  registerPlatform: record('platform'),
  registerAccessory: record('accessory'),
  registerPlatformAccessories: () => {},
  unregisterPlatformAccessories: () => {},
  updatePlatformAccessories: () => {},
  publishExternalAccessories: () => {},
  on: () => {},
};
Promise.resolve()
  .then(async () => {
    let mod;
    try {
      mod = require(target);
    } catch (err) {
      if (err && err.code === 'ERR_REQUIRE_ESM') mod = await import(require('url').pathToFileURL(require.resolve(target)));
      else throw err;
    }
    const init = typeof mod === 'function' ? mod : mod && mod.default;
    if (typeof init !== 'function') throw new Error('entry module exports no initializer');
    await init(api);
  })
  .then(() => {
    process.stdout.write(JSON.stringify(found));
    process.exit(0);
  })
  .catch((err) => {
    process.stderr.write(String((err && err.stack) || err));
    process.exit(1);
  });
"#;

#[derive(Debug, Deserialize)]
struct ProbeHit {
    alias: String,
    #[serde(rename = "type")]
    kind: CapabilityKind,
}

/// Run the harness against the plugin's package directory.
///
/// A missing interpreter yields an empty list; anything the plugin does
/// wrong is an error for the caller to log.
pub fn run(plugin: &PluginRecord, timeout: Duration) -> Result<Vec<CapabilityRecord>> {
    let Ok(node) = which::which(NODE_PROGRAM) else {
        tracing::debug!(plugin = %plugin.name, "node not found, skipping probe");
        return Ok(Vec::new());
    };

    let package = plugin.install_directory.canonicalize().map_err(|_| {
        HubError::Verification(format!(
            "install directory {} does not exist",
            plugin.install_directory.display()
        ))
    })?;

    let mut cmd = Command::new(node);
    cmd.arg("-e").arg(HARNESS).arg(&package).current_dir(&package);

    let output = command_exec::run_command_with_timeout(&mut cmd, timeout)?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let first = stderr.lines().next().unwrap_or("").trim().to_string();
        return Err(HubError::SystemCommandFailed {
            command: format!("{} probe of {}", NODE_PROGRAM, plugin.name),
            reason: if first.is_empty() {
                format!("exit status {}", output.status)
            } else {
                first
            },
        });
    }

    parse_hits(&plugin.name, &output.stdout)
}

fn parse_hits(plugin_name: &str, stdout: &[u8]) -> Result<Vec<CapabilityRecord>> {
    let hits: Vec<ProbeHit> = serde_json::from_slice(stdout)?;
    Ok(hits
        .into_iter()
        .map(|hit| CapabilityRecord {
            plugin_name: plugin_name.to_string(),
            alias: hit.alias,
            kind: hit.kind,
        })
        .collect())
}
