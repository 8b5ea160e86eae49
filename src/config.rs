//! Server Configuration
//!
//! A small read-mostly registry built once from the command line at startup
//! and treated as immutable afterward. The dispatcher only ever reads it:
//! `CONFIG GET` exposes the fixed parameter names `dir` and `dbfilename`.

use crate::{DEFAULT_HOST, DEFAULT_PORT};
use std::path::PathBuf;

/// Configuration assembled from startup arguments.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Directory holding the snapshot file
    pub dir: String,
    /// Snapshot file name inside `dir`
    pub dbfilename: String,
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            dir: "/tmp/redis-data".to_string(),
            dbfilename: "dump.rdb".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Parses configuration from command-line arguments (program name
    /// already stripped).
    ///
    /// # Errors
    ///
    /// Returns a message suitable for printing when a flag is unknown or
    /// missing its value.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut config = ServerConfig::default();

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--dir" => {
                    config.dir = Self::flag_value(args, &mut i)?;
                }
                "--dbfilename" => {
                    config.dbfilename = Self::flag_value(args, &mut i)?;
                }
                "--host" => {
                    config.host = Self::flag_value(args, &mut i)?;
                }
                "--port" => {
                    let value = Self::flag_value(args, &mut i)?;
                    config.port = value
                        .parse()
                        .map_err(|_| format!("invalid port number: {}", value))?;
                }
                other => {
                    return Err(format!("unknown argument: {}", other));
                }
            }
        }

        Ok(config)
    }

    fn flag_value(args: &[String], i: &mut usize) -> Result<String, String> {
        let flag = &args[*i];
        let value = args
            .get(*i + 1)
            .ok_or_else(|| format!("{} requires a value", flag))?;
        *i += 2;
        Ok(value.clone())
    }

    /// Looks up a registry parameter by name. Only the fixed set of known
    /// parameters is exposed; anything else is `None`.
    pub fn get(&self, param: &str) -> Option<&str> {
        match param {
            "dir" => Some(&self.dir),
            "dbfilename" => Some(&self.dbfilename),
            _ => None,
        }
    }

    /// Path of the snapshot file: `<dir>/<dbfilename>`.
    pub fn snapshot_path(&self) -> PathBuf {
        PathBuf::from(&self.dir).join(&self.dbfilename)
    }

    /// Returns the bind address as a string.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
