//! erdx CLI — DTD-Validierung und Token-Inspektion für XML.

#[cfg(feature = "fast-alloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use clap::{Args, Parser, Subcommand};
use erdx::{
    DtdValidator, EntityHandling, EntityResolvingReader, NodeKind, ReaderOptions, TokenRead,
    TokenSource,
};
use std::io::{IsTerminal, Read, Write};
use std::process;

#[derive(Parser)]
#[command(name = "erdx", about = "DTD-Validierung und Token-Inspektion für XML")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Dokument gegen seine DTD validieren
    Validate(ValidateArgs),
    /// Tokenstrom eines Dokuments ausgeben
    Tokens(TokensArgs),
}

#[derive(Args)]
struct ValidateArgs {
    /// Eingabedatei (- für stdin)
    input: String,
}

#[derive(Args)]
struct TokensArgs {
    /// Eingabedatei (- für stdin)
    input: String,

    /// Entity-Referenzen als Token ausgeben statt sie zu expandieren
    #[arg(long)]
    report_entities: bool,

    /// Maximale Verschachtelungstiefe der Entity-Expansion
    #[arg(long, value_name = "N")]
    max_entity_depth: Option<usize>,
}

fn read_input(path: &str) -> Result<Vec<u8>, String> {
    if path == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("Lese von stdin (Ctrl+D zum Beenden)...");
        }
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("Lesefehler (stdin): {e}"))?;
        Ok(buf)
    } else {
        std::fs::read(path).map_err(|e| format!("Lesefehler '{}': {e}", path))
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Validate(args) => run_validate(args),
        Command::Tokens(args) => run_tokens(args),
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let data = read_input(&args.input)?;
    let reader = EntityResolvingReader::for_document(data);
    let mut validator = DtdValidator::new(reader);
    validator.run().map_err(|e| format!("Lesefehler: {e}"))?;

    let errors = validator.errors();
    if errors.is_empty() {
        println!("{}: gültig", args.input);
        return Ok(());
    }
    for error in errors {
        println!("{error}");
    }
    if errors.len() == 1 {
        Err("1 Verstoß gefunden".into())
    } else {
        Err(format!("{} Verstöße gefunden", errors.len()))
    }
}

fn run_tokens(args: TokensArgs) -> Result<(), String> {
    let data = read_input(&args.input)?;
    let mut options = ReaderOptions::default();
    if args.report_entities {
        options = options.with_entity_handling(EntityHandling::Report);
    }
    if let Some(depth) = args.max_entity_depth {
        options = options.with_max_entity_depth(depth);
    }
    let mut reader = EntityResolvingReader::with_options(TokenSource::for_document(data), options);

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    while reader.advance().map_err(|e| format!("Lesefehler: {e}"))? {
        print_token(&mut reader, &mut out)?;
    }
    out.flush().map_err(|e| format!("Schreibfehler: {e}"))
}

/// Eine Zeile pro Token, eingerückt nach Tiefe.
fn print_token<R: TokenRead, W: Write>(reader: &mut R, out: &mut W) -> Result<(), String> {
    let indent = "  ".repeat(reader.depth());
    let kind = reader.kind();
    let result = match kind {
        NodeKind::StartElement => {
            let mut line = format!("{indent}StartElement {}", reader.name());
            for index in 0..reader.attribute_count() {
                if reader.move_to_attribute_index(index) {
                    let attr = format!(" {}=\"{}\"", reader.name(), reader.value().escape_debug());
                    line.push_str(&attr);
                }
            }
            reader.move_to_element();
            if reader.is_empty_element() {
                line.push_str(" (leer)");
            }
            writeln!(out, "{line}")
        }
        NodeKind::EndElement
        | NodeKind::EntityReference
        | NodeKind::EndEntity
        | NodeKind::ProcessingInstruction
        | NodeKind::DocumentType => {
            writeln!(out, "{indent}{kind:?} {}", reader.name())
        }
        NodeKind::Text | NodeKind::Whitespace | NodeKind::CData | NodeKind::Comment => {
            writeln!(out, "{indent}{kind:?} \"{}\"", reader.value().escape_debug())
        }
        _ => writeln!(out, "{indent}{kind:?}"),
    };
    result.map_err(|e| format!("Schreibfehler: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn parse_cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("CLI parse failed")
    }

    #[test]
    fn validate_braucht_eingabe() {
        assert!(Cli::try_parse_from(["erdx", "validate"]).is_err());
    }

    #[test]
    fn tokens_flags_werden_uebernommen() {
        let cli = parse_cli(&[
            "erdx",
            "tokens",
            "in.xml",
            "--report-entities",
            "--max-entity-depth",
            "8",
        ]);
        let Command::Tokens(args) = cli.command else {
            panic!("tokens erwartet");
        };
        assert_eq!(args.input, "in.xml");
        assert!(args.report_entities);
        assert_eq!(args.max_entity_depth, Some(8));
    }

    #[test]
    fn tokens_defaults() {
        let cli = parse_cli(&["erdx", "tokens", "-"]);
        let Command::Tokens(args) = cli.command else {
            panic!("tokens erwartet");
        };
        assert_eq!(args.input, "-");
        assert!(!args.report_entities);
        assert_eq!(args.max_entity_depth, None);
    }

    #[test]
    fn max_entity_depth_braucht_zahl() {
        let err = Cli::try_parse_from(["erdx", "tokens", "in.xml", "--max-entity-depth", "viele"]);
        assert!(err.is_err());
    }

    #[test]
    fn run_validate_meldet_lesefehler() {
        let args = ValidateArgs { input: "/nicht/vorhanden.xml".into() };
        let err = run_validate(args).expect_err("Lesefehler erwartet");
        assert!(err.contains("Lesefehler"));
    }
}
