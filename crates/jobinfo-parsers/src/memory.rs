//! Memory parsing utilities for Slurm output.
//!
//! Sizes are kept in KiB, the smallest unit sstat and sacct print, and
//! only scaled up for display.

const KIB_PER_MIB: u64 = 1024;
const KIB_PER_GIB: u64 = 1024 * KIB_PER_MIB;
const KIB_PER_TIB: u64 = 1024 * KIB_PER_GIB;

/// What a requested-memory value applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryScope {
    /// Whole job ("4G", newer sacct)
    Total,
    /// Per allocated node ("4Gn")
    PerNode,
    /// Per allocated CPU ("1000Mc")
    PerCpu,
}

/// Parse memory string to KiB.
///
/// Handles the formats sacct and sstat print:
/// - "400K", "1000M", "4G", "1T" (binary units)
/// - "1.50M" (fractional values, rounded to the nearest KiB)
/// - "4096" (no suffix, assumed MB)
///
/// Returns None for empty strings or anything unparseable.
pub fn parse_memory_kb(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (number, factor) = match s.char_indices().last()? {
        (i, 'T') => (&s[..i], KIB_PER_TIB),
        (i, 'G') => (&s[..i], KIB_PER_GIB),
        (i, 'M') => (&s[..i], KIB_PER_MIB),
        (i, 'K') => (&s[..i], 1),
        // Assume MB if no suffix
        _ => (s, KIB_PER_MIB),
    };

    let value: f64 = number.parse().ok()?;
    if value < 0.0 || !value.is_finite() {
        return None;
    }
    Some((value * factor as f64).round() as u64)
}

/// Parse sacct's ReqMem field, which may carry a scope suffix
/// (n = per node, c = per core).
pub fn parse_requested_memory(s: &str) -> Option<(u64, MemoryScope)> {
    let s = s.trim();
    let (value, scope) = if let Some(stripped) = s.strip_suffix('n') {
        (stripped, MemoryScope::PerNode)
    } else if let Some(stripped) = s.strip_suffix('c') {
        (stripped, MemoryScope::PerCpu)
    } else {
        (s, MemoryScope::Total)
    };
    parse_memory_kb(value).map(|kb| (kb, scope))
}

/// Format KiB for display (e.g., "400 KB", "512 MB", "4.0 GB", "1.50 TB").
pub fn format_memory_kb(kb: u64) -> String {
    if kb >= KIB_PER_TIB {
        format!("{:.2} TB", kb as f64 / KIB_PER_TIB as f64)
    } else if kb >= KIB_PER_GIB {
        format!("{:.1} GB", kb as f64 / KIB_PER_GIB as f64)
    } else if kb >= KIB_PER_MIB {
        format!("{} MB", (kb + KIB_PER_MIB / 2) / KIB_PER_MIB)
    } else {
        format!("{} KB", kb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_memory_kb() {
        assert_eq!(parse_memory_kb("4G"), Some(4 * 1024 * 1024));
        assert_eq!(parse_memory_kb("1000M"), Some(1000 * 1024));
        assert_eq!(parse_memory_kb("4096K"), Some(4096));
        assert_eq!(parse_memory_kb("4096"), Some(4096 * 1024));
        assert_eq!(parse_memory_kb("1.50M"), Some(1536));
        assert_eq!(parse_memory_kb("1T"), Some(1024 * 1024 * 1024));
        assert_eq!(parse_memory_kb("0"), Some(0));
        assert_eq!(parse_memory_kb(""), None);
        assert_eq!(parse_memory_kb("lots"), None);
    }

    #[test]
    fn test_sub_megabyte_sample_is_not_zero() {
        assert_eq!(parse_memory_kb("400K"), Some(400));
        assert_eq!(format_memory_kb(400), "400 KB");
    }

    #[test]
    fn test_parse_requested_memory() {
        assert_eq!(
            parse_requested_memory("4Gn"),
            Some((4 * 1024 * 1024, MemoryScope::PerNode))
        );
        assert_eq!(
            parse_requested_memory("1000Mc"),
            Some((1000 * 1024, MemoryScope::PerCpu))
        );
        assert_eq!(
            parse_requested_memory("16G"),
            Some((16 * 1024 * 1024, MemoryScope::Total))
        );
        assert_eq!(parse_requested_memory("n"), None);
    }

    #[test]
    fn test_format_memory_kb() {
        assert_eq!(format_memory_kb(0), "0 KB");
        assert_eq!(format_memory_kb(512 * 1024), "512 MB");
        assert_eq!(format_memory_kb(1536), "2 MB");
        assert_eq!(format_memory_kb(4 * 1024 * 1024), "4.0 GB");
        assert_eq!(format_memory_kb(1536 * 1024), "1.5 GB");
        assert_eq!(format_memory_kb(1024 * 1024 * 1024), "1.00 TB");
    }
}
