use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use log::info;

use dh_template_bridge::config::{init_default_config, BridgeConfig};
use dh_template_bridge::conftool::{CachedLookup, ConfToolClient, PaperLookup, User};
use dh_template_bridge::logging::init_logging;
use dh_template_bridge::odf::convert::paper_id_of;
use dh_template_bridge::odf::template::load_template;
use dh_template_bridge::odf::{OdfPackage, OdtConverter};

#[derive(Parser, Debug)]
#[command(name = "dh-template-bridge")]
#[command(about = "Personalize conference ODT templates from ConfTool and clean submitted documents", long_about = None)]
struct Args {
    /// Generate a default config file, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write the config file to (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite an existing config file when used with --init-config
    #[arg(long)]
    force: bool,

    /// Submitted .odt to convert
    #[arg(value_name = "ODT")]
    input: Option<PathBuf>,

    /// Output .odt (default: <input_stem>_converted.odt or paper_<id>.odt)
    #[arg(short, long, value_name = "ODT")]
    output: Option<PathBuf>,

    /// Config file path (default: search for dh-template-bridge.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// ConfTool user name
    #[arg(long)]
    user: Option<String>,

    /// ConfTool password (default: $DH_CONFTOOL_PASSWORD)
    #[arg(long, env = "DH_CONFTOOL_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Write the template personalized for this paper id, then exit
    #[arg(long, value_name = "PAPER_ID")]
    personalize: Option<i64>,

    /// Print the user's papers as JSON, then exit
    #[arg(long)]
    list_papers: bool,

    /// Print the ConfTool paper id stored in the input's metadata (no network)
    #[arg(long)]
    show_paper_id: bool,

    /// Only parse + re-serialize the input's XML parts (no network)
    #[arg(long)]
    roundtrip_only: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let cfg = BridgeConfig::resolve(args.config.clone()).context("build config")?;

    if args.list_papers || args.personalize.is_some() {
        let (client, user) = login(&cfg, &args)?;
        let lookup = CachedLookup::new(client);
        if args.list_papers {
            let user = lookup.detailed_user(&user).context("fetch user details")?;
            let papers = lookup.papers(&user).context("fetch papers")?;
            println!("{}", serde_json::to_string_pretty(&papers)?);
        }
        if let Some(paper_id) = args.personalize {
            let paper = lookup.paper(&user, paper_id).context("look up paper")?;
            let template = load_template(cfg.template_path.as_deref())?;
            let bytes = OdtConverter::with_template(template)
                .personalized_template(&paper)
                .with_context(|| format!("personalize template for paper {paper_id}"))?;
            let output = args
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("paper_{paper_id}.odt")));
            write_output(&output, &bytes)?;
        }
        return Ok(());
    }

    let input = match args.input.clone() {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            eprintln!(
                "\n\nUSAGE:\n  dh-template-bridge --user NAME <submission.odt>\n  dh-template-bridge --user NAME --personalize <PAPER_ID>\n\nTIPS:\n  - Default config search: dh-template-bridge.toml (upwards), or set DH_TEMPLATE_BRIDGE_CONFIG.\n"
            );
            return Ok(());
        }
    };
    let source =
        std::fs::read(&input).with_context(|| format!("read input: {}", input.display()))?;

    if args.show_paper_id {
        let id = paper_id_of(&source).with_context(|| format!("read paper id: {}", input.display()))?;
        println!("{id}");
        return Ok(());
    }

    let output = match args.output.clone() {
        Some(p) => p,
        None => {
            let stem = input
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("output")
                .to_string();
            input.with_file_name(format!("{stem}_converted.odt"))
        }
    };

    if args.roundtrip_only {
        let mut pkg = OdfPackage::open(&source)?;
        let names: Vec<String> = pkg
            .xml_entries()
            .iter()
            .filter(|e| !e.data.is_empty())
            .map(|e| e.name.clone())
            .collect();
        for name in names {
            let tree = pkg
                .xml_part(&name)
                .with_context(|| format!("parse xml: {name}"))?;
            pkg.put_xml_part(&name, &tree);
        }
        write_output(&output, &pkg.to_bytes()?)?;
        return Ok(());
    }

    let (client, user) = login(&cfg, &args)?;
    let bytes = OdtConverter::new()
        .convert(&source, &user, &client)
        .with_context(|| format!("convert {}", input.display()))?;
    write_output(&output, &bytes)?;
    Ok(())
}

fn login(cfg: &BridgeConfig, args: &Args) -> anyhow::Result<(ConfToolClient, User)> {
    let (url, shared_pass) = cfg.conftool_credentials()?;
    let username = args.user.as_deref().context("missing --user")?;
    let password = args
        .password
        .as_deref()
        .context("missing --password (or DH_CONFTOOL_PASSWORD)")?;
    let client = ConfToolClient::new(url, shared_pass).context("create conftool client")?;
    let user = client
        .authenticate(username, password)
        .with_context(|| format!("log in as {username}"))?;
    info!("logged in as {} (id {})", user.username, user.user_id);
    Ok((client, user))
}

fn write_output(output: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    std::fs::write(output, bytes).with_context(|| format!("write output: {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(())
}
