use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{CommandFactory, Parser, Subcommand};

use material_studio::export::json::{load_topic_list, write_topic_list};
use material_studio::export::{parse_markdown_context, ExportFormat};
use material_studio::generation::{helper_prompt, GenerationClient};
use material_studio::llm::TextGenerator;
use material_studio::material::MaterialKind;
use material_studio::progress::ConsoleProgress;
use material_studio::quality::interactive::run_repair_session;
use material_studio::quality::{run_quality_check, RepairEngine};
use material_studio::textutil::decode_text;
use material_studio::trace::TraceWriter;
use material_studio::workflow::{
    export_materials, init_default_config, run_batch, BatchOptions, Session, StudioConfig,
};

#[derive(Parser, Debug)]
#[command(name = "material-studio")]
#[command(about = "Business-English material generator with duplicate-expression checks", long_about = None)]
struct Args {
    /// Config file path (default: search for material-studio.toml upwards)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Session file (default: [pipeline] session in the config)
    #[arg(long, global = true, value_name = "JSON")]
    session: Option<PathBuf>,

    /// Suppress progress lines on stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default config and prompt files, then exit
    InitConfig {
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },
    /// Learner context (industry, level, counseling memo, teaching policy)
    Context {
        #[command(subcommand)]
        action: ContextCmd,
    },
    /// Topic list management
    Topics {
        #[command(subcommand)]
        action: TopicsCmd,
    },
    /// Suggest concrete situations for one topic
    Situations { topic: String },
    /// Per-kind material templates
    Template {
        #[command(subcommand)]
        action: TemplateCmd,
    },
    /// Generate one material per topic, sequentially
    Generate {
        /// Restrict the batch to these topics (repeatable; default: whole list)
        #[arg(long = "topic", value_name = "TOPIC")]
        topics: Vec<String>,
        #[arg(long)]
        no_audio: bool,
        #[arg(long)]
        no_quality_check: bool,
    },
    /// Quality report; `--repair` walks the duplicate groups interactively
    Check {
        #[arg(long)]
        repair: bool,
        #[arg(long)]
        no_context: bool,
        #[arg(long)]
        no_level: bool,
        #[arg(long)]
        no_duplicate: bool,
    },
    /// Export materials
    Export {
        /// json | text | markdown | docx | gdocs
        #[arg(long, default_value = "json")]
        format: String,
        /// 1-based material numbers, e.g. 1,3
        #[arg(long, value_name = "LIST")]
        select: Option<String>,
        /// Client name for the Markdown vault folder
        #[arg(long)]
        client: Option<String>,
    },
    /// List generated materials
    List,
    /// Print the companion prompt (audio script, discussion framework, chart) for one material
    Prompt { number: usize },
}

#[derive(Subcommand, Debug)]
enum ContextCmd {
    Set {
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        job_role: Option<String>,
        #[arg(long)]
        level: Option<String>,
        #[arg(long)]
        goal: Option<String>,
        #[arg(long, value_name = "FILE")]
        memo_file: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        policy_file: Option<PathBuf>,
        #[arg(long, value_name = "FILE")]
        scenes_file: Option<PathBuf>,
    },
    /// Import memo, policy, scenes and topics from a Markdown note
    Import { path: PathBuf },
    Show,
}

#[derive(Subcommand, Debug)]
enum TopicsCmd {
    Generate,
    Add { topic: String },
    Remove { number: usize },
    Clear,
    List,
    Save,
    Load { path: PathBuf },
}

#[derive(Subcommand, Debug)]
enum TemplateCmd {
    Show { kind: Option<String> },
    Set { kind: String, key: String, value: String },
    Reset,
    Save,
    Load { path: PathBuf },
    /// Select the material kind for the next batch
    Use { kind: String },
}

fn parse_kind(s: &str) -> anyhow::Result<MaterialKind> {
    MaterialKind::parse(s)
        .ok_or_else(|| anyhow!("unknown material kind: {s} (role_play | discussion | expression_practice)"))
}

fn read_text_file(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read: {}", path.display()))?;
    Ok(decode_text(&bytes).trim().to_string())
}

fn build_client(cfg: &StudioConfig) -> anyhow::Result<GenerationClient<Box<dyn TextGenerator>>> {
    let trace = TraceWriter::new(cfg.trace_dir.clone(), cfg.trace_prompts).context("init trace")?;
    Ok(
        GenerationClient::new(cfg.build_generator()?, cfg.prompts.clone(), cfg.generation.clone())
            .with_trace(trace),
    )
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    let Some(command) = args.command else {
        Args::command().print_help().context("print help")?;
        eprintln!(
            "\n\nTIPS:\n  - Start with: material-studio init-config\n  - Config search: material-studio.toml (upwards), or set MATERIAL_STUDIO_CONFIG.\n"
        );
        return Ok(());
    };

    if let Command::InitConfig { dir, force } = &command {
        let dir = dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, *force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let workdir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let cfg = StudioConfig::resolve(args.config, &workdir).context("build config")?;
    let session_path = args.session.unwrap_or_else(|| cfg.session_path.clone());
    let mut session = Session::load_or_default(&session_path)?;
    log::debug!("config {} session {}", cfg.config_path.display(), session_path.display());

    let dirty = match command {
        Command::InitConfig { .. } => false,
        Command::Context { action } => run_context(action, &mut session)?,
        Command::Topics { action } => run_topics(action, &cfg, &mut session, &progress)?,
        Command::Situations { topic } => {
            let mut client = build_client(&cfg)?;
            let got = client.generate_detailed_situations(&session.context, &topic);
            if got.is_fallback() {
                eprintln!("(fallback situations: generation was unavailable)");
            }
            for (i, s) in got.value.iter().enumerate() {
                println!("{}. {s}", i + 1);
            }
            false
        }
        Command::Template { action } => run_template(action, &cfg, &mut session)?,
        Command::Generate {
            topics,
            no_audio,
            no_quality_check,
        } => {
            let mut client = build_client(&cfg)?;
            let quality = (cfg.quality_after_generate && !no_quality_check).then(|| cfg.quality.clone());
            let opts = BatchOptions {
                topics,
                no_audio,
                quality,
            };
            let report = run_batch(&mut client, &mut session, &opts, &progress)?;
            println!("{}", report.render_block());
            true
        }
        Command::Check {
            repair,
            no_context,
            no_level,
            no_duplicate,
        } => {
            let mut opts = cfg.quality.clone();
            opts.check_context &= !no_context;
            opts.check_level &= !no_level;
            opts.check_duplicates &= !no_duplicate;
            let report = run_quality_check(&session.materials, &session.context, &opts);
            println!("{}", report.render_block());
            if repair {
                let mut client = build_client(&cfg)?;
                let mut engine = RepairEngine::from_groups(report.duplicate_groups, opts.detect);
                let stdin = io::stdin();
                let mut input = stdin.lock();
                let mut out = io::stdout();
                let outcome = run_repair_session(
                    &mut input,
                    &mut out,
                    &mut engine,
                    &mut session.materials,
                    &mut client,
                )?;
                outcome.slots_written > 0
            } else {
                false
            }
        }
        Command::Export {
            format,
            select,
            client,
        } => {
            let format = ExportFormat::parse(&format)
                .ok_or_else(|| anyhow!("unknown export format: {format} (json | text | markdown | docx | gdocs)"))?;
            for line in export_materials(&cfg, &session, format, select.as_deref(), client.as_deref())? {
                println!("{line}");
            }
            false
        }
        Command::List => {
            if session.materials.is_empty() {
                println!("No materials yet.");
            }
            for (i, m) in session.materials.iter().enumerate() {
                let mark = if m.fallback { " (fallback)" } else { "" };
                println!(
                    "{}. [{}] {} - {} expressions{mark}",
                    i + 1,
                    m.kind().label_ja(),
                    m.topic,
                    m.useful_expressions.len()
                );
            }
            false
        }
        Command::Prompt { number } => {
            let m = number
                .checked_sub(1)
                .and_then(|i| session.materials.get(i))
                .ok_or_else(|| anyhow!("no material number {number}"))?;
            match helper_prompt(m, &session.templates) {
                Some(p) => println!("{p}"),
                None => println!("No companion prompt for this material."),
            }
            false
        }
    };

    if dirty {
        session.save(&session_path)?;
        log::debug!("saved session: {}", session_path.display());
    }
    Ok(())
}

fn run_context(action: ContextCmd, session: &mut Session) -> anyhow::Result<bool> {
    let ctx = &mut session.context;
    match action {
        ContextCmd::Set {
            industry,
            job_role,
            level,
            goal,
            memo_file,
            policy_file,
            scenes_file,
        } => {
            if let Some(v) = industry {
                ctx.industry = v;
            }
            if let Some(v) = job_role {
                ctx.job_role = v;
            }
            if let Some(v) = level {
                ctx.english_level = v;
            }
            if let Some(v) = goal {
                ctx.learning_goal = v;
            }
            if let Some(p) = memo_file {
                ctx.counseling_memo = read_text_file(&p)?;
            }
            if let Some(p) = policy_file {
                ctx.teaching_policy = read_text_file(&p)?;
            }
            if let Some(p) = scenes_file {
                ctx.business_scenes = read_text_file(&p)?;
            }
            println!("{}", session.context.readiness(&session.topics).render_block());
            Ok(true)
        }
        ContextCmd::Import { path } => {
            let imported = parse_markdown_context(&read_text_file(&path)?);
            if !imported.counseling_memo.is_empty() {
                ctx.counseling_memo = imported.counseling_memo;
            }
            if !imported.teaching_policy.is_empty() {
                ctx.teaching_policy = imported.teaching_policy;
            }
            if !imported.business_scenes.is_empty() {
                ctx.business_scenes = imported.business_scenes;
            }
            let added = imported.topics.iter().filter(|t| session.add_topic(t)).count();
            println!("Imported context from {} ({added} new topics)", path.display());
            println!("{}", session.context.readiness(&session.topics).render_block());
            Ok(true)
        }
        ContextCmd::Show => {
            println!("業界: {}", ctx.industry_or_default());
            println!("職種: {}", ctx.job_role_or_default());
            println!("英語レベル: {}", ctx.level_or_default());
            println!("学習目標: {}", ctx.goal_or_default());
            println!("\n[カウンセリング内容]\n{}", ctx.counseling_memo);
            println!("\n[学習方針]\n{}", ctx.teaching_policy);
            println!("\n[ビジネスシーン]\n{}", ctx.business_scenes);
            let readiness = session.context.readiness(&session.topics);
            println!("\n{}", readiness.render_block());
            for hint in readiness.missing_hints() {
                println!("hint: {hint}");
            }
            Ok(false)
        }
    }
}

fn run_topics(
    action: TopicsCmd,
    cfg: &StudioConfig,
    session: &mut Session,
    progress: &ConsoleProgress,
) -> anyhow::Result<bool> {
    match action {
        TopicsCmd::Generate => {
            let mut client = build_client(cfg)?;
            progress.info(format!("Generating topics with {}", client.generator_name()));
            let got = client.generate_primary_topics(&session.context);
            if got.is_fallback() {
                eprintln!("(fallback topics: generation was unavailable)");
            }
            session.topics = got.value;
            print_topics(&session.topics);
            Ok(true)
        }
        TopicsCmd::Add { topic } => {
            if !session.add_topic(&topic) {
                return Err(anyhow!("topic is blank or already listed: {topic}"));
            }
            print_topics(&session.topics);
            Ok(true)
        }
        TopicsCmd::Remove { number } => {
            let removed = session
                .remove_topic(number)
                .ok_or_else(|| anyhow!("no topic number {number}"))?;
            println!("Removed: {removed}");
            Ok(true)
        }
        TopicsCmd::Clear => {
            session.topics.clear();
            Ok(true)
        }
        TopicsCmd::List => {
            print_topics(&session.topics);
            Ok(false)
        }
        TopicsCmd::Save => {
            let path = write_topic_list(&cfg.output_dir, &session.topics)?;
            println!("{}", path.display());
            Ok(false)
        }
        TopicsCmd::Load { path } => {
            session.topics = load_topic_list(&path)?;
            print_topics(&session.topics);
            Ok(true)
        }
    }
}

fn print_topics(topics: &[String]) {
    if topics.is_empty() {
        println!("No topics yet.");
    }
    for (i, t) in topics.iter().enumerate() {
        println!("{}. {t}", i + 1);
    }
}

fn run_template(action: TemplateCmd, cfg: &StudioConfig, session: &mut Session) -> anyhow::Result<bool> {
    match action {
        TemplateCmd::Show { kind } => {
            let kind = match kind {
                Some(k) => parse_kind(&k)?,
                None => session.kind,
            };
            println!("{}", session.templates.describe(kind));
            Ok(false)
        }
        TemplateCmd::Set { kind, key, value } => {
            let kind = parse_kind(&kind)?;
            session.templates.set_field(kind, &key, &value)?;
            println!("{}", session.templates.describe(kind));
            Ok(true)
        }
        TemplateCmd::Reset => {
            session.templates.reset();
            Ok(true)
        }
        TemplateCmd::Save => {
            let path = session.templates.save_timestamped(&cfg.output_dir)?;
            println!("{}", path.display());
            Ok(false)
        }
        TemplateCmd::Load { path } => {
            session.templates.merge_from_file(&path)?;
            Ok(true)
        }
        TemplateCmd::Use { kind } => {
            session.kind = parse_kind(&kind)?;
            println!("Material kind: {}", session.kind.label_ja());
            Ok(true)
        }
    }
}
