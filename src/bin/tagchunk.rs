use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use log::info;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::PathBuf;
use tagchunk::{GrammarRule, RuleSet, Span, TaggedReader, parse_rule};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "tagchunk")]
#[command(about = "Chunk part-of-speech-tagged text with tag patterns")]
struct Args {
    /// Rules file of `LABEL: pattern` lines
    #[arg(short, long)]
    grammar: Option<PathBuf>,

    /// Extra rule, lower priority than the grammar file (repeatable)
    #[arg(short, long = "rule", value_name = "'LABEL: pattern'")]
    rules: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Lowercase words before matching
    #[arg(long)]
    lowercase: bool,

    /// Print each rule's transition table and exit
    #[arg(long)]
    show_automata: bool,

    /// `word/TAG` input files, one sentence per line (`.gz` allowed); stdin when empty
    inputs: Vec<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    /// `[NP the/DT dog/NN] barked/VBD`
    Text,
    /// One JSON array of spans per sentence
    Json,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rules = load_rules(&args)?;
    info!("loaded {} rules", rules.len());

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    if args.show_automata {
        for rule in rules.rules() {
            writeln!(out, "{}: {}\n{}", rule.label(), rule.pattern(), rule.automaton())?;
        }
        out.flush()?;
        return Ok(());
    }

    if args.inputs.is_empty() {
        let stdin: Box<dyn BufRead> = Box::new(io::stdin().lock());
        let reader = TaggedReader::new(stdin).lowercase(args.lowercase);
        chunk(reader, &rules, args.format, &mut out).context("reading stdin")?;
    } else {
        for path in &args.inputs {
            let reader = TaggedReader::from_file(path)
                .with_context(|| format!("opening {}", path.display()))?
                .lowercase(args.lowercase);
            chunk(reader, &rules, args.format, &mut out)
                .with_context(|| format!("reading {}", path.display()))?;
        }
    }

    out.flush()?;
    Ok(())
}

fn load_rules(args: &Args) -> Result<RuleSet> {
    let mut rules = match &args.grammar {
        Some(path) => RuleSet::from_file(path)?,
        None => RuleSet::default(),
    };

    for text in &args.rules {
        let (label, pattern) = parse_rule(text).with_context(|| format!("rule {:?}", text))?;
        rules.push(GrammarRule::from_pattern(&label, pattern)?);
    }

    if rules.is_empty() {
        bail!("no rules given; use --grammar or --rule");
    }
    Ok(rules)
}

fn chunk<R: BufRead, W: Write>(
    reader: TaggedReader<R>,
    rules: &RuleSet,
    format: Format,
    out: &mut W,
) -> Result<()> {
    for sentence in reader {
        let spans = rules.parse(&sentence?);
        match format {
            Format::Text => writeln!(out, "{}", render_text(&spans))?,
            Format::Json => writeln!(out, "{}", serde_json::to_string(&spans)?)?,
        }
    }
    Ok(())
}

/// Bracket labeled spans and leave unlabeled tokens bare
fn render_text(spans: &[Span]) -> String {
    spans
        .iter()
        .map(|span| {
            let tokens: Vec<String> = span.tokens.iter().map(|t| t.to_string()).collect();
            match span.label() {
                Some(label) => format!("[{} {}]", label, tokens.join(" ")),
                None => tokens.join(" "),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
