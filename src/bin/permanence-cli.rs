#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use permanence::{
    config::RosterConfig,
    model::{Shift, ShiftField},
    roster::{DataOrigin, Roster},
};
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Planning d'astreinte mis en cache depuis un calendrier et un annuaire
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    /// Fichier JSON de configuration du roster
    #[arg(long, global = true, default_value = "roster.json")]
    config: String,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Personne(s) d'astreinte en ce moment
    Current {
        /// Affiche tous les shifts actifs, pas seulement le premier
        #[arg(long)]
        all: bool,
        #[arg(long, value_enum, value_delimiter = ',', default_values = ["name", "email", "phone"])]
        fields: Vec<ShiftField>,
    },

    /// Shifts recouvrant une plage
    Query {
        /// RFC3339
        #[arg(long)]
        start: String,
        /// RFC3339
        #[arg(long)]
        end: String,
        #[arg(long, value_enum, value_delimiter = ',', default_values = ["start", "end", "name"])]
        fields: Vec<ShiftField>,
    },

    /// Personnes d'astreinte jour par jour
    Report {
        /// YYYY-MM-DD
        #[arg(long)]
        from: String,
        /// YYYY-MM-DD (inclus)
        #[arg(long)]
        to: String,
    },

    /// Jusqu'à quand la couverture est continue
    Runway,

    /// Statistiques et contrôle d'intégrité
    Stats,

    /// Rafraîchir le cache depuis le calendrier
    Update,

    /// Afficher tout le cache
    Table {
        #[arg(long, value_enum, value_delimiter = ',', default_values = ["start", "end", "name", "email", "phone"])]
        fields: Vec<ShiftField>,
    },
}

fn render(shift: &Shift, fields: &[ShiftField], tz: &Tz) -> String {
    fields
        .iter()
        .map(|f| match f {
            ShiftField::Start => shift.start().with_timezone(tz).to_rfc3339(),
            ShiftField::End => shift.end().with_timezone(tz).to_rfc3339(),
            other => shift.field(*other).unwrap_or_else(|| "-".to_string()),
        })
        .collect::<Vec<_>>()
        .join("\t")
}

fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
    let dt = DateTime::parse_from_rfc3339(raw).with_context(|| format!("invalid RFC3339: {raw}"))?;
    Ok(dt.with_timezone(&Utc))
}

fn parse_day(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("invalid date: {raw}"))
}

fn fmt_opt(dt: Option<DateTime<Utc>>, tz: &Tz) -> String {
    dt.map(|d| d.with_timezone(tz).to_rfc3339())
        .unwrap_or_else(|| "-".to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .with_writer(std::io::stderr)
            .try_init();
    }

    let cfg = RosterConfig::load(&cli.config)?;
    let tz = cfg.tz()?;
    let mut roster = Roster::from_config(&cfg);

    let code = match cli.cmd {
        Commands::Current { all, fields } => {
            let current = roster.current()?;
            if current.is_empty() {
                eprintln!("Nobody on duty for {}, using fallback contact", roster.identity());
                println!(
                    "-\t{}\t{}",
                    cfg.fallback_email.as_deref().unwrap_or("-"),
                    cfg.fallback_phone.as_deref().unwrap_or("-")
                );
                2
            } else {
                let take = if all { current.len() } else { 1 };
                for shift in current.iter().take(take) {
                    let line = fields
                        .iter()
                        .map(|f| match f {
                            ShiftField::Email if shift.email().is_none() => {
                                cfg.fallback_email.clone().unwrap_or_else(|| "-".into())
                            }
                            ShiftField::Phone if shift.phone().is_none() => {
                                cfg.fallback_phone.clone().unwrap_or_else(|| "-".into())
                            }
                            _ => render(shift, std::slice::from_ref(f), &tz),
                        })
                        .collect::<Vec<_>>()
                        .join("\t");
                    println!("{line}");
                }
                0
            }
        }
        Commands::Query { start, end, fields } => {
            let start = parse_instant(&start)?;
            let end = parse_instant(&end)?;
            for shift in roster.query(start, end)? {
                println!("{}", render(&shift, &fields, &tz));
            }
            0
        }
        Commands::Report { from, to } => {
            let from = parse_day(&from)?;
            let to = parse_day(&to)?;
            for day in roster.report(from, to, &tz)? {
                let names = if day.names.is_empty() {
                    "-".to_string()
                } else {
                    day.names.join(", ")
                };
                println!("{}\t{}", day.date, names);
            }
            0
        }
        Commands::Runway => {
            let now = Utc::now();
            let until = roster.runway_at(now)?;
            let hours = (until - now).num_minutes() as f64 / 60.0;
            println!("{}\t{:.1}h", until.with_timezone(&tz).to_rfc3339(), hours);
            0
        }
        Commands::Stats => {
            let stats = roster.stats()?;
            println!("roster.name\t{}", roster.identity());
            println!("roster.calendar\t{}", roster.external_id());
            println!("cache.min_end\t{}", fmt_opt(Some(stats.min_end), &tz));
            println!("cache.max_start\t{}", fmt_opt(stats.max_start, &tz));
            println!("cache.timestamp\t{}", fmt_opt(stats.cache_timestamp, &tz));
            println!("cache.shifts\t{}", stats.shift_count);
            println!("cache.fragments\t{}", stats.fragments);
            println!("cache.coverage_end\t{}", fmt_opt(stats.coverage_end, &tz));
            println!("cache.overlaps\t{}", stats.overlaps.len());
            println!("runway\t{}", fmt_opt(Some(stats.runway), &tz));
            if stats.has_integrity_problem() {
                for hole in &stats.holes {
                    eprintln!(
                        "hole: {} -> {}",
                        hole.start.with_timezone(&tz).to_rfc3339(),
                        hole.end.with_timezone(&tz).to_rfc3339()
                    );
                }
                for overlap in &stats.overlaps {
                    eprintln!(
                        "overlap: {} -> {}",
                        overlap.start.with_timezone(&tz).to_rfc3339(),
                        overlap.end.with_timezone(&tz).to_rfc3339()
                    );
                }
                // Code 2 = WARNING/INCOMPLETE
                2
            } else {
                0
            }
        }
        Commands::Update => {
            match roster.update_cache()? {
                DataOrigin::Live => {
                    println!("Cache updated for {}", roster.identity());
                    0
                }
                DataOrigin::Cached => {
                    eprintln!(
                        "Calendar unreachable for {}, cache left untouched",
                        roster.identity()
                    );
                    2
                }
            }
        }
        Commands::Table { fields } => {
            for shift in roster.shifts()? {
                println!("{}", render(shift, &fields, &tz));
            }
            0
        }
    };

    std::process::exit(code);
}
