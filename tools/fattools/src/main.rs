mod logger;

use std::env;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::process::ExitCode;

use fat_volume::{Attributes, DirectoryEntry, Storage, TreeEntry, Volume};
use log::debug;
use owo_colors::OwoColorize;

const USAGE: &str = "\
usage: fattools IMAGE [--info] [-l DIR] [-r FILE] [-f] [-s SECTOR] [--attr FILE HEX]

  --info            volume geometry, subtype and label (default)
  -l, --list DIR    list files below DIR recursively ('.' is the root)
  -r, --read FILE   write the contents of FILE to stdout
  -f, --frag        list all fragmented files
  -s, --sect SECTOR find out which file is on SECTOR
  --attr FILE HEX   set the attribute byte of FILE (opens the image read-write)

Set FATTOOLS_LOG=debug (or trace) for diagnostics on stderr.";

#[derive(Debug, PartialEq)]
enum Command {
    Info,
    List(String),
    Read(String),
    Fragmented,
    Sector(u64),
    SetAttributes(String, Attributes),
}

#[derive(Debug, PartialEq)]
struct Args {
    image: String,
    commands: Vec<Command>,
}

impl Args {
    fn writes(&self) -> bool {
        self.commands.iter().any(|c| matches!(c, Command::SetAttributes(..)))
    }
}

fn take_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{flag} needs a value"))
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut image = None;
    let mut commands = Vec::new();
    while let Some(arg) = args.next() {
        let command = match arg.as_str() {
            "--info" => Command::Info,
            "-l" | "--list" => Command::List(take_value(&mut args, &arg)?),
            "-r" | "--read" => Command::Read(take_value(&mut args, &arg)?),
            "-f" | "--frag" => Command::Fragmented,
            "-s" | "--sect" => {
                let sector = take_value(&mut args, &arg)?;
                Command::Sector(
                    sector.parse().map_err(|_| format!("invalid sector number \"{sector}\""))?,
                )
            }
            "--attr" => {
                let path = take_value(&mut args, &arg)?;
                let hex = take_value(&mut args, &arg)?;
                Command::SetAttributes(path, parse_attributes(&hex)?)
            }
            flag if flag.starts_with('-') && flag.len() > 1 => {
                return Err(format!("unknown option \"{flag}\""));
            }
            _ if image.is_none() => {
                image = Some(arg.clone());
                continue;
            }
            _ => return Err(format!("unexpected argument \"{arg}\"")),
        };
        commands.push(command);
    }

    let image = image.ok_or_else(|| "missing IMAGE".to_string())?;
    if commands.is_empty() {
        commands.push(Command::Info);
    }
    Ok(Args { image, commands })
}

/// `20`, `0x22` or `0X01`; every bit is accepted as given.
fn parse_attributes(hex: &str) -> Result<Attributes, String> {
    let digits = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex);
    u8::from_str_radix(digits, 16)
        .map(Attributes::from_bits_retain)
        .map_err(|_| format!("invalid attribute byte \"{hex}\""))
}

/// `1.5KiB`-style size with one decimal.
fn format_size(bytes: u64) -> String {
    let mut num = bytes as f64;
    for unit in ["", "Ki", "Mi", "Gi", "Ti", "Pi"] {
        if num < 1024.0 {
            return format!("{num:3.1}{unit}B");
        }
        num /= 1024.0;
    }
    format!("{num:.1}EiB")
}

/// `RHSVDA` with `-` for every clear bit.
fn attribute_letters(attributes: Attributes) -> String {
    [
        (Attributes::READ_ONLY, 'R'),
        (Attributes::HIDDEN, 'H'),
        (Attributes::SYSTEM, 'S'),
        (Attributes::VOLUME_LABEL, 'V'),
        (Attributes::DIRECTORY, 'D'),
        (Attributes::ARCHIVE, 'A'),
    ]
    .into_iter()
    .map(|(flag, letter)| if attributes.contains(flag) { letter } else { '-' })
    .collect()
}

// ─── Commands ──────────────────────────────────────────────────────────────────

fn print_info<S: Storage>(volume: &mut Volume<S>, out: &mut impl Write) -> fat_volume::Result<()> {
    let label = volume.volume_label()?;
    let g = volume.geometry();
    let l = volume.layout();
    let rows = [
        ("OEM name", g.oem.clone()),
        ("Volume label", label.unwrap_or_else(|| "(none)".into())),
        ("FAT type", l.fat_type.name().into()),
        ("Bytes per sector", g.bytes_per_sector.to_string()),
        ("Sectors per cluster", g.sectors_per_cluster.to_string()),
        ("Reserved sectors", g.reserved_sectors.to_string()),
        ("FAT copies", g.num_fats.to_string()),
        ("Sectors per FAT", g.sectors_per_fat.to_string()),
        ("Root entries", g.root_entries.to_string()),
        ("Total sectors", g.total_sectors.to_string()),
        ("Media descriptor", format!("{:#04x}", g.media_descriptor)),
        ("Sectors per track", g.sectors_per_track.to_string()),
        ("Heads", g.num_heads.to_string()),
        ("Hidden sectors", g.hidden_sectors.to_string()),
        ("Clusters", l.cluster_count.to_string()),
        ("Cluster size", format_size(l.cluster_size)),
        ("First data sector", (l.data_start / l.sector_size).to_string()),
    ];
    for (key, value) in rows {
        writeln!(out, "{:<22}{value}", format!("{key}:"))?;
    }
    Ok(())
}

fn list_line(item: &TreeEntry) -> String {
    let e = &item.entry;
    if e.is_directory() {
        format!("{:<30} {:<27} {} {}", item.path, "<DIR>", e.accessed, e.modified)
    } else {
        format!(
            "{:<30} {:<10} cluster #{:<6} {} {}",
            item.path,
            format_size(e.size as u64),
            e.cluster,
            e.accessed,
            e.modified
        )
    }
}

fn describe(entry: &DirectoryEntry, path: &str, out: &mut impl Write) -> io::Result<()> {
    let rows = [
        ("path", path.to_string()),
        ("attributes", format!("{} ({:#04x})", attribute_letters(entry.attributes), entry.attributes.bits())),
        ("size", entry.size.to_string()),
        ("cluster", entry.cluster.to_string()),
        ("created", entry.created.to_string()),
        ("last accessed", entry.accessed.to_string()),
        ("modified", entry.modified.to_string()),
    ];
    for (key, value) in rows {
        writeln!(out, "{:<15}{value}", format!("{key}:"))?;
    }
    Ok(())
}

fn execute<S: Storage>(
    volume: &mut Volume<S>,
    command: &Command,
    out: &mut impl Write,
) -> fat_volume::Result<()> {
    debug!("running {command:?}");
    match command {
        Command::Info => print_info(volume, out)?,
        Command::List(dir) => {
            let dir = if dir == "." { "" } else { dir.as_str() };
            for item in volume.walk_tree(dir)? {
                writeln!(out, "{}", list_line(&item))?;
            }
        }
        Command::Read(path) => out.write_all(&volume.read_file(path)?)?,
        Command::Fragmented => {
            for item in volume.fragmented_files()? {
                writeln!(out, "{} is fragmented", item.path)?;
            }
        }
        Command::Sector(sector) => match volume.file_owning_sector(*sector)? {
            Some(item) => describe(&item.entry, &item.path, out)?,
            None => writeln!(out, "Cannot find any file that occupies sector {sector}")?,
        },
        Command::SetAttributes(path, attributes) => {
            volume.set_attribute(path, *attributes)?;
            writeln!(out, "{path}: attributes set to {}", attribute_letters(*attributes))?;
        }
    }
    Ok(())
}

fn run(args: &Args) -> fat_volume::Result<()> {
    let image = OpenOptions::new().read(true).write(args.writes()).open(&args.image)?;
    let mut volume = Volume::open(image)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for command in &args.commands {
        execute(&mut volume, command, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(e) = logger::init(logger::level_from_env()) {
        eprintln!("failed to install logger: {e}");
    }

    let argv: Vec<String> = env::args().skip(1).collect();
    if argv.iter().any(|a| a == "-h" || a == "--help") {
        println!("{USAGE}");
        return ExitCode::SUCCESS;
    }
    let args = match parse_args(argv.into_iter()) {
        Ok(args) => args,
        Err(msg) => {
            eprintln!("{} {msg}\n\n{USAGE}", "error:".bright_red());
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}: {e}", "error:".bright_red(), args.image);
            ExitCode::FAILURE
        }
    }
}
