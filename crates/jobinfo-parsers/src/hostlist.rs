//! Slurm hostlist expansion.
//!
//! Node lists are printed in compressed form, e.g. `node[01-03,07],gpu1`.

/// Expand a Slurm hostlist expression into individual host names, in order.
///
/// Zero padding of range bounds is preserved (`n[08-10]` → `n08, n09, n10`).
/// Several bracket groups in one name expand as a cartesian product.
/// A malformed entry is returned verbatim.
pub fn expand_hostlist(hostlist: &str) -> Vec<String> {
    let hostlist = hostlist.trim();
    if hostlist.is_empty() || hostlist == "(null)" || hostlist == "None assigned" {
        return Vec::new();
    }

    let mut hosts = Vec::new();
    for entry in split_top_level(hostlist) {
        match expand_entry(entry) {
            Some(expanded) => hosts.extend(expanded),
            None => {
                tracing::warn!("Malformed hostlist entry: {}", entry);
                hosts.push(entry.to_string());
            }
        }
    }
    hosts
}

/// Split on commas that are not inside brackets.
fn split_top_level(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts.into_iter().filter(|p| !p.is_empty()).collect()
}

fn expand_entry(entry: &str) -> Option<Vec<String>> {
    let Some(open) = entry.find('[') else {
        return Some(vec![entry.to_string()]);
    };
    let close = open + entry[open..].find(']')?;
    let prefix = &entry[..open];
    let ranges = &entry[open + 1..close];
    let suffixes = expand_entry(&entry[close + 1..])?;

    let mut hosts = Vec::new();
    for range in ranges.split(',') {
        for index in expand_range(range)? {
            for suffix in &suffixes {
                hosts.push(format!("{}{}{}", prefix, index, suffix));
            }
        }
    }
    Some(hosts)
}

/// Expand `01-03` or `7` into zero-padded indices.
fn expand_range(range: &str) -> Option<Vec<String>> {
    let (lo, hi) = range.split_once('-').unwrap_or((range, range));
    let width = lo.len();
    let start: u64 = lo.parse().ok()?;
    let end: u64 = hi.parse().ok()?;
    if end < start {
        return None;
    }
    Some(
        (start..=end)
            .map(|i| format!("{:0width$}", i, width = width))
            .collect(),
    )
}
