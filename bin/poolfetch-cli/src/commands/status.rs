// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `poolfetch status` command: display system memory state and the
//! classified pressure level.

use pressure_monitor::{MemInfo, PressureThresholds};

pub async fn execute() -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║          poolfetch · Memory Pressure Status          ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let info = MemInfo::read()?;
    let thresholds = PressureThresholds::default();
    let utilisation = info.utilisation();
    let level = thresholds.level_for(utilisation);

    println!("  Memory");
    println!("   Total:        {} MB", info.total_bytes / (1024 * 1024));
    println!("   Available:    {} MB", info.available_mb());
    println!(
        "   Used:         {} MB ({:.1}%)  {}",
        info.used_bytes() / (1024 * 1024),
        utilisation * 100.0,
        usage_bar(utilisation),
    );
    println!();

    println!("  Pressure");
    println!("   Level:        {level:?}");
    println!(
        "   Thresholds:   moderate >= {:.0}%, critical >= {:.0}%",
        thresholds.moderate * 100.0,
        thresholds.critical * 100.0,
    );
    match level.aggressiveness() {
        Some(aggressiveness) => {
            println!("   Pools would:  trim ({aggressiveness:?})");
        }
        None => println!("   Pools would:  retain free lists"),
    }

    Ok(())
}

/// Creates a visual usage bar (0.0-1.0 scale).
fn usage_bar(ratio: f64) -> String {
    let filled = (ratio * 20.0).round() as usize;
    let filled = filled.min(20);
    let empty = 20 - filled;
    let symbol = if ratio >= 0.9 {
        "#"
    } else if ratio >= 0.75 {
        "="
    } else {
        "-"
    };
    format!("[{}{}]", symbol.repeat(filled), ".".repeat(empty))
}
