//! ROM library scanning and HTML fragment rendering.
//!
//! The fragment is spliced into the page template by the render cache and is
//! also used for the bookmark view. Output order is fully determined by names
//! (systems ascending, ROMs ascending within a system), so identical library
//! state always renders identical bytes and therefore the same ETag.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::ErrorKind;
use std::path::Path;

use crate::Error;

/// File extensions (lowercase, without dot) listed as playable ROMs.
pub const ROM_EXTENSIONS: &[&str] = &["zip", "7z", "gba", "nds", "iso", "bin", "chd", "sfc", "smc"];

/// Size at which the gauge is full.
const GAUGE_FULL_MIB: f64 = 20.0;

/// Smallest gauge fill so tiny files stay visible.
const GAUGE_MIN_PERCENT: f64 = 5.0;

pub const LIBRARY_ACCENT: &str = "#E55B5B";
pub const BOOKMARK_ACCENT: &str = "#F57C00";

pub const LIBRARY_EMPTY: &str = r#"<div style="text-align:center; padding:50px; color:#aaa;">No games found.<br>Put game files into the ./data/roms folder.</div>"#;
pub const BOOKMARKS_EMPTY: &str =
    r#"<div style="text-align:center; padding:50px; color:#aaa;">No bookmarked games.</div>"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomEntry {
    pub name: String,
    pub size: u64,
}

/// ROMs of one system, sorted by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shelf {
    pub system: String,
    pub roms: Vec<RomEntry>,
}

/// Sorted view over all systems that have at least one ROM.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub shelves: Vec<Shelf>,
}

impl Catalog {
    /// Build a catalog from unsorted groups; empty groups are dropped.
    pub fn from_groups(groups: BTreeMap<String, Vec<RomEntry>>) -> Self {
        let shelves = groups
            .into_iter()
            .filter(|(_, roms)| !roms.is_empty())
            .map(|(system, mut roms)| {
                roms.sort_by(|a, b| a.name.cmp(&b.name));
                Shelf { system, roms }
            })
            .collect();
        Self { shelves }
    }

    pub fn is_empty(&self) -> bool {
        self.shelves.is_empty()
    }

    /// Render category blocks, or `empty` when there is nothing to show.
    pub fn render(&self, accent: &str, empty: &str) -> String {
        if self.is_empty() {
            return empty.to_string();
        }

        let mut out = String::new();
        for shelf in &self.shelves {
            let _ = write!(
                out,
                r#"<div class="category"><div class="category-title" style="border-left-color: {accent};">{} <span class="game-count">({})</span></div><div class="rom-grid">"#,
                escape_html(&shelf.system),
                shelf.roms.len()
            );
            for rom in &shelf.roms {
                write_card(&mut out, &shelf.system, rom);
            }
            out.push_str("</div></div>");
        }
        out
    }
}

/// Scan `content_dir`: each immediate subdirectory is a system, each
/// immediate file with a ROM extension is an entry. A missing directory is an
/// empty library.
pub async fn scan(content_dir: &Path) -> Result<Catalog, Error> {
    let mut groups = BTreeMap::new();

    let mut systems = match tokio::fs::read_dir(content_dir).await {
        Ok(dir) => dir,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Catalog::default()),
        Err(e) => return Err(e.into()),
    };

    while let Some(entry) = systems.next_entry().await? {
        if !entry.file_type().await?.is_dir() {
            continue;
        }
        let system = entry.file_name().to_string_lossy().into_owned();
        match scan_system(&entry.path()).await {
            Ok(roms) => {
                groups.insert(system, roms);
            }
            Err(e) => tracing::warn!(system, error = %e, "skipping unreadable system directory"),
        }
    }

    Ok(Catalog::from_groups(groups))
}

async fn scan_system(dir: &Path) -> Result<Vec<RomEntry>, Error> {
    let mut roms = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if !meta.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_rom_file(&name) {
            roms.push(RomEntry { name, size: meta.len() });
        }
    }
    Ok(roms)
}

pub fn is_rom_file(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .is_some_and(|ext| ROM_EXTENSIONS.contains(&ext.as_str()))
}

/// Gauge fill for a file size, clamped to `[5, 100]` percent.
pub fn gauge_fill_percent(size: u64) -> f64 {
    let mib = size as f64 / (1024.0 * 1024.0);
    ((mib / GAUGE_FULL_MIB) * 100.0).clamp(GAUGE_MIN_PERCENT, 100.0)
}

fn write_card(out: &mut String, system: &str, rom: &RomEntry) {
    let display = Path::new(&rom.name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_uppercase())
        .unwrap_or_else(|| rom.name.to_uppercase());
    // The cover hides the part of the gradient beyond the fill.
    let cover = 100.0 - gauge_fill_percent(rom.size);

    let sys_attr = escape_html(system);
    let rom_attr = escape_html(&rom.name);
    let sys_js = escape_html(&escape_js(system));
    let rom_js = escape_html(&escape_js(&rom.name));

    let _ = write!(
        out,
        r#"<div class="rom-card" data-sys="{sys_attr}" data-rom="{rom_attr}" onclick="Launcher.run('{sys_js}', '{rom_js}')" oncontextmenu="App.showCtx(event, '{sys_js}', '{rom_js}')" ontouchstart="App.handleTouch(event, '{sys_js}', '{rom_js}')"><span class="rom-name">{}</span><div class="size-gauge"><div class="gauge-cover" style="width:{cover:.1}%"></div></div></div>"#,
        escape_html(&display)
    );
}

fn escape_js(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}
