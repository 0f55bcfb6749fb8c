//! CLI definitions for ginue
//!
//! This module contains all CLI argument parsing structures using clap.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::EnvSettings;
use crate::domain::app::AppSpec;
use crate::domain::descriptor::{FileType, Operation};
use crate::error::ConfigError;

#[derive(Parser)]
#[command(
    name = "ginue",
    version,
    disable_version_flag = true,
    about = "Sync kintone app settings with a local file tree",
    long_about = "Pull kintone app settings into version-controlled files, push them back to the\n\
                  staging area of any environment, then deploy or reset the staged changes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Print version
    #[arg(short = 'v', long, action = ArgAction::Version)]
    #[allow(dead_code)]
    version: Option<bool>,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download app settings into the local tree
    Pull(RunArgs),

    /// Upload local settings to the staging area
    Push(RunArgs),

    /// Discard staged settings
    Reset(RunArgs),

    /// Apply staged settings to production
    Deploy(RunArgs),

    /// Write a PlantUML diagram of the lookup relationships
    Erd(RunArgs),

    /// Compare two environment directories in the diff viewer
    Diff(RunArgs),
}

impl Commands {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Pull(_) => Operation::Pull,
            Self::Push(_) => Operation::Push,
            Self::Reset(_) => Operation::Reset,
            Self::Deploy(_) => Operation::Deploy,
            Self::Erd(_) => Operation::Erd,
            Self::Diff(_) => Operation::Diff,
        }
    }

    pub fn args(&self) -> &RunArgs {
        match self {
            Self::Pull(args)
            | Self::Push(args)
            | Self::Reset(args)
            | Self::Deploy(args)
            | Self::Erd(args)
            | Self::Diff(args) => args,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Target environment, or <environment>:<push target environment>
    pub target: Option<String>,

    #[command(flatten)]
    pub options: SyncOptions,
}

/// Connection and layout flags shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct SyncOptions {
    /// kintone domain (e.g. example.cybozu.com)
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Login name
    #[arg(short, long, alias = "username")]
    pub user: Option<String>,

    /// Login password
    #[arg(short, long)]
    pub password: Option<String>,

    /// App IDs (1,2,3) or name=id pairs (orders=10,customers=11)
    #[arg(short, long)]
    pub app: Option<String>,

    /// Guest space ID
    #[arg(short, long)]
    pub guest: Option<String>,

    /// Basic authentication as user[:password]
    #[arg(short, long)]
    pub basic: Option<String>,

    /// Restrict the run to one app of the map
    #[arg(short = 'A', long = "appName")]
    pub app_name: Option<String>,

    /// Root directory of the local tree
    #[arg(short, long)]
    pub location: Option<PathBuf>,

    /// Local file format
    #[arg(short = 't', long = "fileType")]
    pub file_type: Option<FileType>,

    /// Command to leave out (repeatable)
    #[arg(short = 'x', long, action = ArgAction::Append)]
    pub exclude: Vec<String>,

    /// Also pull the staged settings
    #[arg(long)]
    pub preview: bool,

    /// Push ACL endpoints
    #[arg(long)]
    pub acl: bool,

    /// Push field/acl.json (together with --acl)
    #[arg(long = "field-acl")]
    pub field_acl: bool,

    /// Write masked "-alt" copies for cross-environment comparison
    #[arg(long)]
    pub alt: bool,

    /// Authenticate with an OAuth access token
    #[arg(long)]
    pub oauth: bool,

    /// PKCS#12 client certificate
    #[arg(short = 'F', long = "pfxFilepath")]
    pub pfx_filepath: Option<PathBuf>,

    /// Client certificate password
    #[arg(short = 'P', long = "pfxPassword")]
    pub pfx_password: Option<String>,
}

impl SyncOptions {
    /// Command-line layer of the settings; unset flags stay `None` so the rc
    /// file can fill them
    pub fn to_settings(&self) -> Result<EnvSettings, ConfigError> {
        let app = self.app.as_deref().map(AppSpec::parse).transpose()?;
        Ok(EnvSettings {
            location: self.location.clone(),
            domain: self.domain.clone(),
            username: self.user.clone(),
            password: self.password.clone(),
            oauth: self.oauth.then_some(true),
            basic: self.basic.clone(),
            pfx_filepath: self.pfx_filepath.clone(),
            pfx_password: self.pfx_password.clone(),
            app,
            app_name: self.app_name.clone(),
            guest: self.guest.clone(),
            file_type: self.file_type,
            preview: self.preview.then_some(true),
            alt: self.alt.then_some(true),
            acl: self.acl.then_some(true),
            field_acl: self.field_acl.then_some(true),
            exclude: (!self.exclude.is_empty()).then(|| self.exclude.clone()),
            ..Default::default()
        })
    }
}
