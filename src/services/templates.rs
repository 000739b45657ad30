//! Declarative unit rendering.
//!
//! Each unit is rendered into one buffer and written with a single atomic
//! write.

use crate::config::settings::Settings;
use crate::instances::types::{InstanceKind, InstanceRecord};
use std::fmt::Write as _;
use std::path::Path;

/// Everything a unit description needs about one instance
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSpec {
    pub description: String,
    /// Program followed by its arguments
    pub exec: Vec<String>,
    pub working_dir: String,
    pub user: Option<String>,
    pub autostart_delay_seconds: u32,
}

impl UnitSpec {
    pub fn for_record(record: &InstanceRecord, settings: &Settings, storage: &Path) -> Self {
        let storage = storage.display().to_string();
        let mut exec = vec![settings.runtime.clone()];
        match record.kind {
            InstanceKind::Hub => exec.push("hub".to_string()),
            InstanceKind::Bridge | InstanceKind::Dev => {
                exec.push("bridge".to_string());
                exec.push("--instance".to_string());
                exec.push(record.id.clone());
            }
        }
        exec.push("--port".to_string());
        exec.push(record.port.to_string());
        exec.push("--storage".to_string());
        exec.push(storage.clone());

        Self {
            description: format!("{} ({})", record.display_name, record.id),
            exec,
            working_dir: storage,
            user: settings.service_user.clone(),
            autostart_delay_seconds: record.autostart_delay_seconds,
        }
    }

    fn exec_line(&self) -> String {
        self.exec
            .iter()
            .map(|a| shlex::try_quote(a).map(|q| q.into_owned()).unwrap_or_else(|_| a.clone()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn render_systemd(spec: &UnitSpec) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "[Unit]");
    let _ = writeln!(out, "Description={}", spec.description);
    let _ = writeln!(out, "Wants=network-online.target");
    let _ = writeln!(out, "After=syslog.target network-online.target");
    let _ = writeln!(out);
    let _ = writeln!(out, "[Service]");
    let _ = writeln!(out, "Type=simple");
    if let Some(user) = &spec.user {
        let _ = writeln!(out, "User={}", user);
    }
    let _ = writeln!(out, "PermissionsStartOnly=true");
    let _ = writeln!(out, "WorkingDirectory={}", spec.working_dir);
    if spec.autostart_delay_seconds > 0 {
        let _ = writeln!(out, "ExecStartPre=/bin/sleep {}", spec.autostart_delay_seconds);
    }
    let _ = writeln!(out, "ExecStart={}", spec.exec_line());
    let _ = writeln!(out, "Restart=on-failure");
    let _ = writeln!(out, "RestartSec=3");
    let _ = writeln!(out, "KillMode=process");
    let _ = writeln!(out);
    let _ = writeln!(out, "[Install]");
    let _ = writeln!(out, "WantedBy=multi-user.target");
    out
}

pub fn render_launchd(label: &str, spec: &UnitSpec) -> String {
    let arguments: Vec<String> = if spec.autostart_delay_seconds > 0 {
        vec![
            "/bin/sh".to_string(),
            "-c".to_string(),
            format!("sleep {}; exec {}", spec.autostart_delay_seconds, spec.exec_line()),
        ]
    } else {
        spec.exec.clone()
    };

    let mut out = String::new();
    let _ = writeln!(out, r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    let _ = writeln!(
        out,
        r#"<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">"#
    );
    let _ = writeln!(out, r#"<plist version="1.0">"#);
    let _ = writeln!(out, "<dict>");
    let _ = writeln!(out, "    <key>Label</key>");
    let _ = writeln!(out, "    <string>{}</string>", xml_escape(label));
    let _ = writeln!(out, "    <key>ProgramArguments</key>");
    let _ = writeln!(out, "    <array>");
    for arg in &arguments {
        let _ = writeln!(out, "        <string>{}</string>", xml_escape(arg));
    }
    let _ = writeln!(out, "    </array>");
    let _ = writeln!(out, "    <key>WorkingDirectory</key>");
    let _ = writeln!(out, "    <string>{}</string>", xml_escape(&spec.working_dir));
    if let Some(user) = &spec.user {
        let _ = writeln!(out, "    <key>UserName</key>");
        let _ = writeln!(out, "    <string>{}</string>", xml_escape(user));
    }
    let _ = writeln!(out, "    <key>RunAtLoad</key>");
    let _ = writeln!(out, "    <true/>");
    let _ = writeln!(out, "    <key>KeepAlive</key>");
    let _ = writeln!(out, "    <true/>");
    let _ = writeln!(out, "    <key>SessionCreate</key>");
    let _ = writeln!(out, "    <false/>");
    let _ = writeln!(out, "</dict>");
    let _ = writeln!(out, "</plist>");
    out
}

fn xml_escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
