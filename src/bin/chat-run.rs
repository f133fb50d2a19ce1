use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::*;

use chatgraph::config::{self, ChatConfig};
use chatgraph::*;

#[derive(Debug, Parser)]
#[command(name = "chat-run", about = "Chat through a dialogue graph in the terminal")]
struct Args {
    /// TOML configuration file.
    #[arg(long, env = "CHAT_CONFIG")]
    config: Option<PathBuf>,
    /// A `.graph` file or the stem of the CSV node/edge tables.
    #[arg(long)]
    graph: Option<PathBuf>,
    /// Name of the first node.
    #[arg(long)]
    start: Option<String>,
    /// Word vectors for semantic matching.
    #[arg(long)]
    embeddings: Option<PathBuf>,
    /// Use the converted GloVe 6B model of this dimension.
    #[arg(long, value_parser = ["50", "100", "200", "300"])]
    glove_dim: Option<String>,
    /// Print the path taken after every turn.
    #[arg(long)]
    debug: bool,
    /// Write the loaded graph as a compiled `.graph` file and exit.
    #[arg(long, value_name = "OUT")]
    compile: Option<PathBuf>,
    /// Write the loaded graph as a Graphviz DOT file and exit.
    #[arg(long, value_name = "OUT")]
    dot: Option<PathBuf>,
}

fn load_config(args: &Args) -> Result<ChatConfig, Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => ChatConfig::load(path)?,
        None => ChatConfig::default(),
    }
    .apply_env();

    if let Some(graph) = &args.graph {
        config.graph = graph.clone();
    }
    if let Some(start) = &args.start {
        config.start_node = start.clone();
    }
    if let Some(dim) = &args.glove_dim {
        config.embeddings = Some(config::glove_path(&PathBuf::from("."), dim.parse()?));
    }
    if let Some(embeddings) = &args.embeddings {
        config.embeddings = Some(embeddings.clone());
    }

    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::init();

    let args = Args::parse();
    let config = load_config(&args)?;
    if args.debug {
        println!("Debug mode enabled");
    }

    let graph = loader::load_graph(&config.graph, &config.start_node)?;

    if let Some(out) = &args.compile {
        fs::write(out, loader::encode(&graph)?)?;
        println!("Compiled {} nodes to {}", graph.len(), out.display());
        return Ok(());
    }

    if let Some(out) = &args.dot {
        fs::write(out, visualize::to_dot(&graph))?;
        println!("Flowchart saved as {}", out.display());
        return Ok(());
    }

    let log: Arc<dyn ChatLog> = match &config.transcript {
        Some(path) => {
            let transcript = Transcript::with_path(path)?;
            if let Some(path) = transcript.path() {
                println!("Logging to {}", path.display());
            }
            Arc::new(transcript)
        }
        None => Arc::new(TraceLog),
    };

    let matcher: MatcherHandle = match &config.embeddings {
        Some(path) => {
            let provider = Arc::new(EmbeddingProvider::new(path));
            if args.debug {
                if let Some(path) = provider.path() {
                    println!("Using word vectors: {}", path.display());
                }
            }
            SoftCosineMatcher::new(config.policy(), provider, log.clone()).into()
        }
        None => StringMatcher::new(config.policy(), log.clone()).into(),
    };

    let mut chat = Chat::new(&graph, matcher, log).with_default(config.default_node.clone());

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut request = START.to_string();

    // Bot lines are forced steps, so they are printed and passed straight through.
    loop {
        let nodes = chat.advance(&request);
        if args.debug {
            println!("Path taken: {}", chat.path());
        }

        match nodes.first() {
            None => break,
            Some(node) if node.is_output() => {
                println!("Chatbot: {}", node.content);
                request = START.to_string();
                continue;
            }
            Some(_) => {
                for choice in nodes.iter().filter(|node| node.kind == NodeKind::Choice) {
                    let label = choice.keywords().next().unwrap_or(choice.name.as_str());
                    println!("  - {}", label);
                }
            }
        }

        print!("You: ");
        io::stdout().flush()?;
        request = match lines.next() {
            Some(line) => line?,
            None => break,
        };
    }

    if let Some(email_node) = &config.ticket_email_node {
        if let Some(ticket) = chat.ticket(email_node) {
            info!("Opening ticket for {}", ticket.email);
            println!("\n=== Ticket ===\n{}", serde_json::to_string_pretty(&ticket)?);
        }
    }

    println!("== Dialogue complete ==");

    Ok(())
}
