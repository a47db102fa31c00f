#![allow(dead_code)]

use std::path::Path;

use execdesk::config::{ConfigFile, RawConfigFile};

/// Builder for `ConfigFile` to simplify test setup.
///
/// Goes through `TryFrom<RawConfigFile>`, so extension lists are normalised
/// exactly as a loaded config would be.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_interpreter(mut self, program: &str) -> Self {
        self.config.interpreter.program = Some(program.to_string());
        self
    }

    pub fn with_script_extensions(mut self, exts: &[&str]) -> Self {
        self.config.interpreter.script_extensions = exts.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_executable_extensions(mut self, exts: &[&str]) -> Self {
        self.config.executable.extensions = exts.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn with_shell(mut self, program: &str) -> Self {
        self.config.shell.program = Some(program.to_string());
        self
    }

    pub fn with_stage_commands(mut self, stage: bool) -> Self {
        self.config.shell.stage_commands = stage;
        self
    }

    pub fn with_staging_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.config.staging.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.config.app.title = title.to_string();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}
