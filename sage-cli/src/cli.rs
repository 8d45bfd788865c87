use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "sage")]
#[command(about = "Oracle ERP support assistant grounded on your own manuals and notes")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// The subcommand to run; plain `sage` starts a chat.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    #[arg(
        long,
        env = "GOOGLE_API_KEY",
        hide_env_values = true,
        global = true,
        help = "Gemini API key (falls back to GEMINI_API_KEY)"
    )]
    pub google_api_key: Option<String>,

    #[arg(
        long,
        env = "SAGE_LOCAL_PATH",
        default_value = "./qdrant_data",
        global = true,
        help = "Local store directory, used when it exists"
    )]
    pub local_path: PathBuf,

    #[arg(long, env = "QDRANT_URL", global = true, help = "Remote Qdrant gRPC URL")]
    pub qdrant_url: Option<String>,

    #[arg(long, env = "QDRANT_API_KEY", hide_env_values = true, global = true)]
    pub qdrant_api_key: Option<String>,

    #[arg(
        long,
        env = "SAGE_COLLECTION",
        default_value = "oracle_knowledge_base",
        global = true
    )]
    pub collection: String,

    #[arg(long, default_value_t = 3, global = true, help = "Chunks retrieved per question")]
    pub top_k: usize,

    #[arg(long, env = "SAGE_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    pub log_format: LogFormat,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    #[command(about = "Chat with the assistant in the terminal (default)")]
    Chat,

    #[command(about = "Load files into the knowledge base")]
    Ingest {
        #[arg(
            default_value = "./data/oracle_knowledge.txt",
            help = "Files or directories to ingest (.pdf is read page by page, anything else as text)"
        )]
        paths: Vec<PathBuf>,

        #[arg(long, help = "Drop and recreate the collection first")]
        recreate: bool,
    },

    #[command(about = "Serve the HTTP API")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
    },

    #[command(about = "Check configuration, Gemini and the vector store")]
    Doctor,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}
