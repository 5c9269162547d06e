// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Loading and saving for ofpktadm: configuration, logging, frame
//! input and output, and action or match files.

use anyhow::Context;
use anyhow::anyhow;
use anyhow::bail;
use ofpkt::config::PacketConfig;
use pcap_parser::Linktype;
use pcap_parser::ToVec;
use pcap_parser::pcap;
use pcap_parser::pcap::LegacyPcapBlock;
use pcap_parser::pcap::PcapHeader;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use slog::Drain;
use slog::FilterLevel;
use slog::Logger;
use std::path::Path;

/// The snap length written into pcap files.
pub const SNAPLEN: u32 = 65535;

/// Contents of the `--config` file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AdmConfig {
    pub packet: PacketConfig,
    pub log: LogConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// One of `off`, `critical`, `error`, `warn`, `info`, `debug` or
    /// `trace`.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl AdmConfig {
    /// Load the configuration at `path`, or the defaults if there is
    /// none.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).with_context(|| {
                    format!("failed to read config {}", path.display())
                })?;
                toml::from_str(&text).with_context(|| {
                    format!("failed to parse config {}", path.display())
                })
            }

            None => Ok(Self::default()),
        }
    }
}

/// Build the logger: terminal output behind an async drain, filtered
/// by `RUST_LOG` on top of the configured level. `verbose` lowers the
/// configured level to `trace`.
pub fn init_logger(cfg: &LogConfig, verbose: bool) -> anyhow::Result<Logger> {
    let level = match verbose {
        true => FilterLevel::Trace,
        false => cfg
            .level
            .parse::<FilterLevel>()
            .map_err(|_| anyhow!("unknown log level: {}", cfg.level))?,
    };

    let decorator = slog_term::TermDecorator::new().stderr().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let mut builder =
        slog_envlogger::LogBuilder::new(drain).filter(None, level);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder = builder.parse(&filters);
    }
    let drain = builder.build().ignore_res();
    let drain = slog_async::Async::new(drain).build().fuse();
    Ok(Logger::root(drain, slog::o!()))
}

/// Parse a frame written as hex digits. Whitespace and `:` or `-`
/// separators are ignored.
pub fn parse_hex(s: &str) -> anyhow::Result<Vec<u8>> {
    let digits: Vec<u8> = s
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b'-')
        .collect();

    if digits.len() % 2 != 0 {
        bail!("odd number of hex digits: {}", digits.len());
    }

    digits
        .chunks(2)
        .map(|pair| {
            let pair = std::str::from_utf8(pair)?;
            u8::from_str_radix(pair, 16)
                .with_context(|| format!("bad hex byte {pair:?}"))
        })
        .collect()
}

/// Read every frame out of a pcap capture held in memory.
pub fn read_pcap(capture: &[u8]) -> anyhow::Result<Vec<Vec<u8>>> {
    let (mut rest, hdr) = pcap::parse_pcap_header(capture)
        .map_err(|e| anyhow!("bad pcap header: {e:?}"))?;

    if hdr.network != Linktype::ETHERNET {
        bail!("unsupported link type: {:?}", hdr.network);
    }

    let mut frames = vec![];
    while !rest.is_empty() {
        let res = match hdr.is_bigendian() {
            true => pcap::parse_pcap_frame_be(rest),
            false => pcap::parse_pcap_frame(rest),
        };
        let (next, block) = res.map_err(|e| {
            anyhow!("bad pcap frame {}: {e:?}", frames.len())
        })?;
        if block.caplen != block.origlen {
            bail!(
                "frame {} truncated by capture: {} of {} bytes",
                frames.len(),
                block.caplen,
                block.origlen,
            );
        }
        frames.push(block.data.to_vec());
        rest = next;
    }

    Ok(frames)
}

/// Serialize `frames` as a pcap capture.
pub fn write_pcap<'a>(
    frames: impl IntoIterator<Item = &'a [u8]>,
) -> anyhow::Result<Vec<u8>> {
    let mut hdr = PcapHeader {
        magic_number: 0xa1b2c3d4,
        version_major: 2,
        version_minor: 4,
        thiszone: 0,
        sigfigs: 0,
        snaplen: SNAPLEN,
        network: Linktype::ETHERNET,
    };
    let mut out =
        hdr.to_vec().map_err(|e| anyhow!("pcap header: {e:?}"))?;

    for (i, data) in frames.into_iter().enumerate() {
        let len = u32::try_from(data.len())?;
        let mut block = LegacyPcapBlock {
            ts_sec: 0,
            ts_usec: 0,
            caplen: len,
            origlen: len,
            data,
        };
        let bytes =
            block.to_vec().map_err(|e| anyhow!("pcap frame {i}: {e:?}"))?;
        out.extend_from_slice(&bytes);
    }

    Ok(out)
}

/// Load a TOML or RON file, chosen by extension.
pub fn load_file<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => toml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display())),
        Some("ron") => ron::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display())),
        _ => bail!("{}: expected a .toml or .ron file", path.display()),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ofpkt::api::Action;
    use ofpkt::api::ActionList;
    use ofpkt::api::FieldId;
    use ofpkt::api::FieldValue;
    use ofpkt::api::MatchSpec;

    #[test]
    fn hex_frames() {
        assert_eq!(parse_hex("de:ad be-EF\n00").unwrap(), vec![
            0xDE, 0xAD, 0xBE, 0xEF, 0x00
        ]);
        assert!(parse_hex("abc").is_err());
        assert!(parse_hex("zz").is_err());
        assert!(parse_hex("").unwrap().is_empty());
    }

    #[test]
    fn pcap_round_trip() {
        let a = ofpkt_test_utils::tcp4_frame();
        let b = ofpkt_test_utils::udp6_frame();
        let cap = write_pcap([a.as_slice(), b.as_slice()]).unwrap();
        assert_eq!(read_pcap(&cap).unwrap(), vec![a.clone(), b]);

        // Captures built by the test utilities read just the same.
        let cap = ofpkt_test_utils::pcap::capture(&[&a]);
        assert_eq!(read_pcap(&cap).unwrap(), vec![a]);

        assert!(read_pcap(&cap[..10]).is_err());
    }

    #[test]
    fn config_defaults() {
        let cfg: AdmConfig = toml::from_str(
            "[packet]\n\
             head_room = 16\n\
             [log]\n\
             level = \"debug\"\n",
        )
        .unwrap();
        assert_eq!(cfg.packet.head_room, 16);
        assert_eq!(cfg.packet.tail_room, PacketConfig::default().tail_room);
        assert_eq!(cfg.log.level, "debug");

        let cfg = AdmConfig::load(None).unwrap();
        assert_eq!(cfg.packet, PacketConfig::default());
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn action_and_match_files() {
        let dir = std::env::temp_dir();
        let toml_path = dir.join("ofpktadm-actions-test.toml");
        std::fs::write(
            &toml_path,
            "actions = [\n\
             \"DecNwTtl\",\n\
             { Push = { kind = \"Vlan\", ethertype = 0x8100 } },\n\
             ]\n",
        )
        .unwrap();
        let list: ActionList = load_file(&toml_path).unwrap();
        assert_eq!(list.actions.len(), 2);
        assert_eq!(list.actions[0], Action::DecNwTtl);

        let ron_path = dir.join("ofpktadm-match-test.ron");
        std::fs::write(
            &ron_path,
            "(entries: { \"tcp_dst\": (value: Int(80), mask: None) })",
        )
        .unwrap();
        let spec: MatchSpec = load_file(&ron_path).unwrap();
        let (field, m) = spec.iter().next().unwrap();
        assert_eq!(*field, FieldId::TCP_DST);
        assert_eq!(m.value, FieldValue::Int(80));

        assert!(load_file::<ActionList>(&dir.join("actions.json")).is_err());

        std::fs::remove_file(toml_path).unwrap();
        std::fs::remove_file(ron_path).unwrap();
    }
}
