// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Print packets in human-friendly manner.
//!
//! This is mostly just a place to hang printing routines so that they
//! can be used by both ofpktadm and integration tests.

use crate::api::Hits;
use crate::engine::Packet;
use std::io::Write;
use tabwriter::TabWriter;

/// Print a [`Packet`].
pub fn print_packet(pkt: &Packet) -> std::io::Result<()> {
    print_packet_into(&mut std::io::stdout(), pkt)
}

/// Print a [`Packet`]: its layers, then its field summary.
pub fn print_packet_into(
    writer: &mut impl Write,
    pkt: &Packet,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);

    writeln!(t, "Packet ({} bytes, in_port {})", pkt.len(), pkt.in_port())?;
    write_hrb(&mut t)?;
    writeln!(t, "Layers")?;
    write_hr(&mut t)?;
    writeln!(t, "IDX\tKIND\tOFFSET\tLEN")?;
    for (i, node) in pkt.chain().iter().enumerate() {
        let span = node.span();
        writeln!(t, "{i}\t{}\t{}\t{}", node.kind(), span.offset, span.len)?;
    }
    t.flush()?;

    writeln!(t, "\nFields")?;
    write_hr(&mut t)?;
    writeln!(t, "FIELD\tCLASS\tVALUE")?;
    for (field, value) in pkt.summary().iter() {
        writeln!(t, "{field}\t{:#06X}\t{value}", field.class().raw())?;
    }
    t.flush()?;

    if pkt.no_packet_in() {
        writeln!(t, "\n(no packet-in)")?;
    }

    writeln!(t)?;
    t.flush()
}

/// Print the hit counts of a match against a packet.
pub fn print_hits_into(
    writer: &mut impl Write,
    name: &str,
    hits: &Hits,
) -> std::io::Result<()> {
    let mut t = TabWriter::new(writer);
    writeln!(t, "MATCH\tEXACT\tWILDCARD\tMISS\tRESULT")?;
    writeln!(
        t,
        "{name}\t{}\t{}\t{}\t{}",
        hits.exact,
        hits.wildcard,
        hits.miss,
        if hits.is_match() { "match" } else { "no match" },
    )?;
    t.flush()
}

/// Output a horizontal rule in bold to the given writer.
pub fn write_hrb(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:=<70}", "=")
}

/// Output a horizontal rule to the given writer.
pub fn write_hr(t: &mut impl Write) -> std::io::Result<()> {
    writeln!(t, "{:-<70}", "-")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn layers_and_fields() {
        #[rustfmt::skip]
        let frame = [
            0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
            0xA8, 0x40, 0x25, 0x00, 0x00, 0x01,
            0x88, 0xB5,
            0xDE, 0xAD,
        ];
        let pkt = Packet::copy_from(&frame, 9).unwrap();
        let mut out = Vec::new();
        print_packet_into(&mut out, &pkt).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.starts_with("Packet (16 bytes, in_port 9)"));
        assert!(out.contains("Ethernet"));
        assert!(out.contains("Opaque"));
        assert!(out.contains("eth_dst"));
        assert!(out.contains("FF:FF:FF:FF:FF:FF"));
    }
}
