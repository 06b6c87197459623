use clap::{Parser, Subcommand};
use std::io::Read;

mod error;
mod outbound;
mod policy;
mod reconcile;
mod source;

pub type Result<T> = anyhow::Result<T>;

#[derive(Parser)]
#[command(name = "outbound-reconcile")]
#[command(about = "Merge produced proxy nodes into a sing-box outbound template", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile a template with freshly produced nodes.
    Merge {
        /// Baseline template JSON; `-` reads stdin.
        #[arg(long)]
        template: String,

        /// Collection to produce nodes from (wins over --names).
        #[arg(long)]
        coll: Option<String>,

        /// Comma-separated subscriptions, fetched in order.
        #[arg(long)]
        names: Option<String>,

        /// Policy JSON layered over the built-in policy.
        #[arg(long)]
        policy: Option<String>,

        /// Directory with collections/<name>.json and subscriptions/<name>.json.
        #[arg(long, conflicts_with = "substore", required_unless_present = "substore")]
        nodes_dir: Option<String>,

        /// Sub-Store backend base URL.
        #[arg(long)]
        substore: Option<String>,

        #[arg(short = 'o', long)]
        out: Option<String>,
    },

    /// Validate a policy file and print what it configures.
    CheckPolicy {
        #[arg(long)]
        policy: Option<String>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.cmd {
        Commands::Merge {
            template,
            coll,
            names,
            policy,
            nodes_dir,
            substore,
            out,
        } => {
            // 1) Policy and producer.
            let policy = policy::load_policy(policy.as_deref())?;
            let producer: Box<dyn source::NodeProducer> = match (nodes_dir, substore) {
                (Some(dir), _) => Box::new(source::DirProducer::new(dir)),
                (None, Some(url)) => Box::new(source::HttpProducer::new(url)),
                (None, None) => anyhow::bail!("either --nodes-dir or --substore is required"),
            };

            // 2) Baseline text; emptiness is reported by the pipeline.
            let baseline = read_template(&template)?;

            // 3) Reconcile.
            let input = reconcile::RunInput {
                baseline: &baseline,
                coll: coll.as_deref(),
                names: names.as_deref(),
            };
            let json = reconcile::run(input, producer.as_ref(), &policy)?;

            // 4) Emit.
            match out {
                Some(out) => {
                    std::fs::write(&out, json + "\n")?;
                    println!("Wrote {}", out);
                }
                None => println!("{}", json),
            }
        }
        Commands::CheckPolicy { policy } => {
            let policy = policy::load_policy(policy.as_deref())?;
            println!(
                "policy ok: {} regions, {} business groups, {} all-node selectors excluded",
                policy.regions.len(),
                policy.business.len(),
                policy.anti_flatten.len()
            );
            for rule in &policy.business {
                println!("  {} -> {}", rule.tag, rule.allowed_regions.join(", "));
            }
        }
    }

    Ok(())
}

fn read_template(path: &str) -> Result<String> {
    use anyhow::Context;

    if path == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("read template from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("read template file {}", path))
}

/// Logs go to stderr so stdout stays a clean JSON document.
fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
