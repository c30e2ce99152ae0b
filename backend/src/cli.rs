//! `studio` command line: gallery administration, project migration and auth

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use studio_storage::{AuthError, MediaFile, MediaKind, StoreError};
use thiserror::Error;

use crate::admin::AdminCapability;
use crate::state::AppContext;
use crate::types::UserNotice;

/// Failures of a single command
#[derive(Debug, Error)]
pub enum CommandError {
    /// A store operation failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Sign-in or the admin check failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// A local file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A local file was not valid JSON
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The command needs credentials that were not given
    #[error("{0}")]
    Usage(&'static str),
}

impl CommandError {
    /// The notice shown for store and auth failures
    #[must_use]
    pub fn notice(&self) -> Option<UserNotice> {
        match self {
            Self::Store(err) => Some(err.into()),
            Self::Auth(err) => Some(err.into()),
            Self::Io { .. } | Self::Json(_) | Self::Usage(_) => None,
        }
    }
}

/// Interior-design studio operator tools
#[derive(Parser, Debug)]
#[command(name = "studio", version, long_about = None)]
pub struct Cli {
    /// Account for commands that need a session
    #[command(flatten)]
    pub credentials: Credentials,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Account used by commands that need a session
#[derive(Args, Debug, Default, Clone)]
pub struct Credentials {
    /// Account email
    #[arg(long, env = "STUDIO_EMAIL", global = true)]
    pub email: Option<String>,

    /// Account password
    #[arg(long, env = "STUDIO_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,
}

/// Top-level command groups
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Public gallery entries
    Gallery {
        /// Gallery action
        #[command(subcommand)]
        command: GalleryCommand,
    },
    /// The signed-in user's projects
    Projects {
        /// Project action
        #[command(subcommand)]
        command: ProjectsCommand,
    },
    /// Accounts and sessions
    Auth {
        /// Auth action
        #[command(subcommand)]
        command: AuthCommand,
    },
}

/// Gallery actions
#[derive(Subcommand, Debug)]
pub enum GalleryCommand {
    /// List entries, newest first
    List {
        /// Only featured entries
        #[arg(long)]
        featured: bool,
    },
    /// Upload a video or thumbnail and print its public URL (admin)
    Upload {
        /// File to upload
        path: PathBuf,
        /// image or video
        #[arg(long)]
        kind: MediaKind,
    },
    /// Delete an entry (admin)
    Delete {
        /// Entry id
        id: String,
    },
}

/// Project actions
#[derive(Subcommand, Debug)]
pub enum ProjectsCommand {
    /// List your projects, most recently updated first
    List,
    /// Import projects exported from browser local storage
    Migrate {
        /// JSON array of locally saved projects
        file: PathBuf,
    },
}

/// Auth actions
#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Sign in and print the account
    SignIn,
    /// Create an account; confirmation happens by email
    SignUp,
    /// Print the URL that starts an external sign-in
    AuthorizeUrl {
        /// Identity provider
        #[arg(long, default_value = "google")]
        provider: String,
        /// Where the provider sends the user back
        #[arg(long)]
        redirect_to: String,
    },
    /// Complete a sign-in from the redirect URL
    Exchange {
        /// Redirect URL carrying the code
        url: String,
    },
}

impl Cli {
    /// Runs the command against `context` and returns what to print
    ///
    /// # Errors
    ///
    /// Returns the store, auth or local file error that stopped the command
    pub async fn run(self, context: &AppContext) -> Result<Value, CommandError> {
        let credentials = self.credentials;
        match self.command {
            Command::Gallery { command } => gallery(command, &credentials, context).await,
            Command::Projects { command } => projects(command, &credentials, context).await,
            Command::Auth { command } => auth(command, &credentials, context).await,
        }
    }
}

async fn sign_in(credentials: &Credentials, context: &AppContext) -> Result<(), CommandError> {
    let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
        return Err(CommandError::Usage(
            "this command needs --email and --password (or STUDIO_EMAIL and STUDIO_PASSWORD)",
        ));
    };
    context.auth.sign_in(email, password).await?;
    Ok(())
}

async fn admin(
    credentials: &Credentials,
    context: &AppContext,
) -> Result<AdminCapability, CommandError> {
    sign_in(credentials, context).await?;
    Ok(context.require_admin().await?)
}

async fn gallery(
    command: GalleryCommand,
    credentials: &Credentials,
    context: &AppContext,
) -> Result<Value, CommandError> {
    match command {
        GalleryCommand::List { featured } => {
            let entries = if featured {
                context.gallery.list_featured().await
            } else {
                context.gallery.list_all().await
            };
            Ok(serde_json::to_value(entries)?)
        }
        GalleryCommand::Upload { path, kind } => {
            let capability = admin(credentials, context).await?;
            let file = read_media(&path).await?;
            let url = context.gallery.upload_media(file, kind).await?;
            tracing::info!("{} uploaded {}", capability.user_id(), path.display());
            Ok(json!({ "url": url }))
        }
        GalleryCommand::Delete { id } => {
            let capability = admin(credentials, context).await?;
            context.gallery.delete(&id).await?;
            tracing::info!("{} deleted gallery entry {id}", capability.user_id());
            Ok(json!({ "deleted": id }))
        }
    }
}

async fn projects(
    command: ProjectsCommand,
    credentials: &Credentials,
    context: &AppContext,
) -> Result<Value, CommandError> {
    sign_in(credentials, context).await?;
    match command {
        ProjectsCommand::List => Ok(serde_json::to_value(context.projects.list_mine().await?)?),
        ProjectsCommand::Migrate { file } => {
            let raw = tokio::fs::read(&file)
                .await
                .map_err(|source| CommandError::Io { path: file, source })?;
            let records: Vec<Value> = serde_json::from_slice(&raw)?;
            let total = records.len();

            let migrated = context.projects.migrate_from_local_storage(records).await;
            Ok(json!({
                "migrated": migrated.len(),
                "skipped": total - migrated.len(),
                "projects": migrated,
            }))
        }
    }
}

async fn auth(
    command: AuthCommand,
    credentials: &Credentials,
    context: &AppContext,
) -> Result<Value, CommandError> {
    match command {
        AuthCommand::SignIn => {
            sign_in(credentials, context).await?;
            Ok(serde_json::to_value(context.auth.fetch_user().await?)?)
        }
        AuthCommand::SignUp => {
            let (Some(email), Some(password)) = (&credentials.email, &credentials.password)
            else {
                return Err(CommandError::Usage("sign-up needs --email and --password"));
            };
            let user = context.auth.sign_up(email, password).await?;
            Ok(serde_json::to_value(user)?)
        }
        AuthCommand::AuthorizeUrl {
            provider,
            redirect_to,
        } => Ok(json!({ "url": context.auth.authorize_url(&provider, &redirect_to)? })),
        AuthCommand::Exchange { url } => {
            let session = context.auth.exchange_code_for_session(&url).await?;
            Ok(serde_json::to_value(session.user)?)
        }
    }
}

async fn read_media(path: &Path) -> Result<MediaFile, CommandError> {
    let bytes = tokio::fs::read(path).await.map_err(|source| CommandError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(MediaFile::new(file_name, content_type_for(path), bytes))
}

/// MIME type guessed from the file extension
#[must_use]
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
