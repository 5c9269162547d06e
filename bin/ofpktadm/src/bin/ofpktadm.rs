// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tabwriter::TabWriter;

use ofpkt::api::API_VERSION;
use ofpkt::api::ActionList;
use ofpkt::api::FieldId;
use ofpkt::api::MatchSpec;
use ofpkt::config::PacketConfig;
use ofpkt::engine::Packet;
use ofpkt::print::print_hits_into;
use ofpkt::print::print_packet_into;
use ofpktadm::AdmConfig;
use ofpktadm::init_logger;
use ofpktadm::load_file;
use ofpktadm::parse_hex;
use ofpktadm::read_pcap;
use ofpktadm::write_pcap;
use slog::Logger;

/// Classify and edit Ethernet frames with the ofpkt engine.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// A TOML file with `[packet]` and `[log]` tables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log everything, down to each parsed layer.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// The ingress port recorded in each packet.
    #[arg(long, global = true, default_value_t = 0)]
    in_port: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the layers and fields of each frame.
    Classify {
        #[command(flatten)]
        input: Input,
    },

    /// Apply an action list to each frame and print the result.
    Apply {
        #[command(flatten)]
        input: Input,

        /// A TOML or RON file holding an `actions` list.
        #[arg(short, long)]
        actions: PathBuf,

        /// Write the edited frames to this pcap file.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Count the exact, wildcard and missed fields of a match against
    /// each frame.
    Match {
        #[command(flatten)]
        input: Input,

        /// A TOML or RON file holding a match specification.
        #[arg(short, long = "match")]
        spec: PathBuf,
    },

    /// List the known OXM fields.
    ListFields,
}

/// Where the frames come from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct Input {
    /// Read frames from a pcap file.
    #[arg(long)]
    pcap: Option<PathBuf>,

    /// A single frame as hex digits.
    #[arg(long)]
    hex: Option<String>,
}

impl Input {
    fn packets(
        &self,
        in_port: u32,
        cfg: &PacketConfig,
        log: &Logger,
    ) -> anyhow::Result<Vec<Packet>> {
        let frames = match (&self.pcap, &self.hex) {
            (Some(path), _) => {
                let capture = std::fs::read(path).with_context(|| {
                    format!("failed to read {}", path.display())
                })?;
                read_pcap(&capture)
                    .with_context(|| format!("in {}", path.display()))?
            }

            (None, Some(hex)) => vec![parse_hex(hex)?],
            (None, None) => anyhow::bail!("one of --pcap or --hex is needed"),
        };

        slog::info!(log, "loaded frames"; "count" => frames.len());

        frames
            .iter()
            .enumerate()
            .map(|(i, frame)| {
                Packet::new(frame, in_port, cfg, log.clone())
                    .with_context(|| format!("frame {i}"))
            })
            .collect()
    }
}

fn print_fields() -> std::io::Result<()> {
    let mut t = TabWriter::new(std::io::stdout());
    writeln!(t, "NAME\tCLASS\tFIELD\tKIND")?;
    for field in FieldId::iter() {
        writeln!(
            t,
            "{}\t{:#06X}\t{}\t{}",
            field.name(),
            field.class().raw(),
            field.field(),
            field.value_kind(),
        )?;
    }
    t.flush()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = AdmConfig::load(cli.config.as_deref())?;
    let log = init_logger(&cfg.log, cli.verbose)?;
    slog::debug!(log, "starting"; "api_version" => API_VERSION);

    let in_port = cli.in_port;
    let mut stdout = std::io::stdout();
    match cli.command {
        Command::Classify { input } => {
            for pkt in input.packets(in_port, &cfg.packet, &log)? {
                print_packet_into(&mut stdout, &pkt)?;
            }
        }

        Command::Apply { input, actions, out } => {
            let list: ActionList = load_file(&actions)?;
            let pkts = input.packets(in_port, &cfg.packet, &log)?;
            let mut edited = vec![];
            for (i, mut pkt) in pkts.into_iter().enumerate() {
                pkt.apply_all(&list.actions)
                    .with_context(|| format!("frame {i}"))?;
                pkt.calc_checksums();
                print_packet_into(&mut stdout, &pkt)?;
                edited.push(pkt.to_vec());
            }

            if let Some(path) = out {
                let capture = write_pcap(edited.iter().map(Vec::as_slice))?;
                std::fs::write(&path, capture).with_context(|| {
                    format!("failed to write {}", path.display())
                })?;
                slog::info!(log, "wrote capture";
                    "path" => %path.display(),
                    "frames" => edited.len(),
                );
            }
        }

        Command::Match { input, spec } => {
            let spec: MatchSpec = load_file(&spec)?;
            let pkts = input.packets(in_port, &cfg.packet, &log)?;
            for (i, pkt) in pkts.iter().enumerate() {
                let hits = pkt.calc_hits(&spec);
                print_hits_into(&mut stdout, &format!("frame {i}"), &hits)?;
            }
        }

        Command::ListFields => print_fields()?,
    }

    Ok(())
}
