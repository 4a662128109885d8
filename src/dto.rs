//! Typed view of the payload served by the backend's `/api/info` route.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    pub title: String,
    pub version: String,
    pub server: ServerDetails,
    pub api: ApiDetails,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
    pub runtime: RuntimeInfo,
    pub platform: PlatformInfo,
    pub memory: MemoryInfo,
    pub uptime: String,
    pub environment: String,
    pub pid: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeInfo {
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInfo {
    pub os: String,
    pub arch: String,
    pub node_version: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryInfo {
    pub heap_used: String,
    pub heap_total: String,
    pub rss: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDetails {
    pub framework: String,
    pub integration: String,
    pub type_system: String,
}

impl ServerInfo {
    /// One-line summary in the order the status card shows it.
    pub fn summary(&self) -> String {
        format!(
            "{} {} | {} {} ({} {}) | heap {} / {} | up {} | pid {}",
            self.title,
            self.version,
            self.server.runtime.name,
            self.server.runtime.version,
            self.server.platform.os,
            self.server.platform.arch,
            self.server.memory.heap_used,
            self.server.memory.heap_total,
            self.server.uptime,
            self.server.pid,
        )
    }
}

#[cfg(test)]
pub(crate) fn sample_payload() -> serde_json::Value {
    serde_json::json!({
        "title": "Elysia API",
        "version": "1.0.0",
        "server": {
            "runtime": { "name": "Bun", "version": "1.2.0" },
            "platform": { "os": "linux", "arch": "x64", "nodeVersion": "v22.0.0" },
            "memory": { "heapUsed": "12MB", "heapTotal": "20MB", "rss": "48MB" },
            "uptime": "42s",
            "environment": "development",
            "pid": 4242
        },
        "api": {
            "framework": "ElysiaJS",
            "integration": "TanStack Start",
            "typeSystem": "Eden Treaty"
        },
        "timestamp": "2025-01-01T00:00:00.000Z"
    })
}
