use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use ziffers_core::Value;
use ziffers_mini::{parse, KeySetting, Options, Pattern, ScaleSetting};

#[derive(Parser)]
#[command(name = "ziffers")]
#[command(about = "Ziffers notation parser and evaluator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a pattern
    Validate {
        /// Pattern to validate
        pattern: String,
    },
    /// Print the node tree of a pattern
    Tree {
        /// Pattern to parse
        pattern: String,

        /// Output format (json or debug)
        #[arg(short, long, default_value = "debug")]
        format: String,
    },
    /// Evaluate a pattern and show its events
    Eval {
        /// Pattern to evaluate
        pattern: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Output format (json or debug)
        #[arg(long, default_value = "debug")]
        format: String,
    },
    /// Step through a pattern the way a live caller would
    Next {
        /// Pattern to iterate
        pattern: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Number of events to take
        #[arg(short = 'n', long, default_value = "8")]
        count: usize,
    },
    /// Print one attribute of every event
    Collect {
        /// Pattern to evaluate
        pattern: String,

        #[command(flatten)]
        options: OptionArgs,

        /// Attribute to collect
        #[arg(short, long, value_enum, default_value = "notes")]
        attribute: Attribute,
    },
}

#[derive(Args)]
struct OptionArgs {
    /// Key as a MIDI number or note name such as C4 or Eb
    #[arg(short, long, default_value = "60")]
    key: String,

    /// Scale name, number or Scala text
    #[arg(short, long, default_value = "MAJOR")]
    scale: String,

    /// Octave offset
    #[arg(short, long, default_value = "0", allow_hyphen_values = true)]
    octave: i64,

    /// Seed for random degrees
    #[arg(long)]
    seed: Option<String>,

    /// Laps between re-evaluations, 0 to never re-evaluate
    #[arg(long, default_value = "1")]
    redo: usize,

    /// Count numeric degrees from 1
    #[arg(long)]
    degrees: bool,
}

impl OptionArgs {
    fn options(&self) -> Options {
        let key = match self.key.parse::<i64>() {
            Ok(midi) => KeySetting::Midi(midi),
            Err(_) => KeySetting::Name(self.key.clone()),
        };
        let scale = match self.scale.parse::<u32>() {
            Ok(number) => ScaleSetting::Number(number),
            Err(_) => ScaleSetting::Name(self.scale.clone()),
        };
        let mut options = Options::new()
            .with_key(key)
            .with_scale(scale)
            .with_octave(self.octave)
            .with_redo(self.redo)
            .with_degrees(self.degrees);
        options.seed = self.seed.clone();
        options
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Attribute {
    Pitches,
    Notes,
    Values,
    Freqs,
    Bends,
    Durations,
    Octaves,
    Sounds,
    Indices,
}

/// Build a pattern, exiting on a parse error instead of printing an empty one
fn build(pattern: &str, options: Options) -> Pattern {
    let built = Pattern::new(pattern, options);
    if let Some(e) = built.error() {
        eprintln!("✗ Parse error: {}", e.report(pattern));
        std::process::exit(1);
    }
    built
}

fn print_values(values: &[Value]) {
    let line: Vec<String> = values.iter().map(Value::to_string).collect();
    println!("{}", line.join(" "));
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { pattern } => match parse(&pattern) {
            Ok(_) => {
                println!("✓ Pattern is valid");
                Ok(())
            }
            Err(e) => {
                eprintln!("✗ Parse error: {}", e.report(&pattern));
                std::process::exit(1);
            }
        },
        Commands::Tree { pattern, format } => match parse(&pattern) {
            Ok(nodes) => {
                match format.as_str() {
                    "json" => {
                        let json = serde_json::to_string_pretty(&nodes)?;
                        println!("{}", json);
                    }
                    _ => {
                        println!("{:#?}", nodes);
                    }
                }
                Ok(())
            }
            Err(e) => {
                eprintln!("✗ Parse error: {}", e.report(&pattern));
                std::process::exit(1);
            }
        },
        Commands::Eval {
            pattern,
            options,
            format,
        } => {
            let pat = build(&pattern, options.options());
            match format.as_str() {
                "json" => {
                    let json = serde_json::to_string_pretty(pat.events())?;
                    println!("{}", json);
                }
                _ => {
                    println!("Events: {}", pat.len());
                    println!("Total duration: {}", pat.total_duration());
                    for (i, event) in pat.events().iter().enumerate() {
                        println!("  [{}] {:?}", i, event);
                    }
                }
            }
            Ok(())
        }
        Commands::Next {
            pattern,
            options,
            count,
        } => {
            let mut pat = build(&pattern, options.options());
            debug!(count, events = pat.len(), "stepping pattern");
            for i in 0..count {
                match pat.next() {
                    Some(event) => println!("{}", serde_json::to_string(&event)?),
                    None => {
                        println!("Pattern has no events after {} step(s)", i);
                        break;
                    }
                }
            }
            Ok(())
        }
        Commands::Collect {
            pattern,
            options,
            attribute,
        } => {
            let pat = build(&pattern, options.options());
            let values = match attribute {
                Attribute::Pitches => pat.pitches(),
                Attribute::Notes => pat.notes(),
                Attribute::Values => pat.values(),
                Attribute::Freqs => pat.freqs(),
                Attribute::Bends => pat.bends(),
                Attribute::Durations => pat.durations(),
                Attribute::Octaves => pat.octaves(),
                Attribute::Sounds => pat.sounds(),
                Attribute::Indices => pat.indices(),
            };
            print_values(&values);
            Ok(())
        }
    }
}
