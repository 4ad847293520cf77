//! Region classifier and region filter (C6): a read-only, sorted view over
//! a region list used for human-facing labels and for allow/deny filtering,
//! both at scan time and at export time.

use crate::region::{
    Region,
    RegionType,
};

const FILENAME_DISPLAY_WIDTH: usize = 24;

struct Entry {
    start: usize,
    end: usize,
    region_type: RegionType,
    filename: String,
}

/// Built once from a region list, immutable afterward. `classify` answers
/// "what backs this address" for presentation, independent of whether the
/// address currently holds a match.
pub struct RegionClassifier {
    entries: Vec<Entry>,
}

impl RegionClassifier {
    pub fn new(regions: &[Region]) -> Self {
        let mut entries: Vec<Entry> = regions
            .iter()
            .map(|r| Entry {
                start: r.start,
                end: r.end,
                region_type: r.region_type,
                filename: r.filename.clone(),
            })
            .collect();
        entries.sort_by_key(|e| e.start);
        RegionClassifier { entries }
    }

    fn entry_at(
        &self,
        addr: usize,
    ) -> Option<&Entry> {
        self.entries
            .binary_search_by(|e| {
                if addr < e.start {
                    std::cmp::Ordering::Greater
                } else if addr >= e.end {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// The region type backing `addr`, or `None` if it falls outside every
    /// known mapping.
    pub fn region_type_at(
        &self,
        addr: usize,
    ) -> Option<RegionType> {
        self.entry_at(addr).map(|e| e.region_type)
    }

    /// `"heap" | "stack" | "exe[:short-filename]" | "code[:short-filename]" | "unk"`.
    pub fn classify(
        &self,
        addr: usize,
    ) -> String {
        let entry = match self.entry_at(addr) {
            Some(entry) => entry,
            None => return "unk".to_string(),
        };

        match entry.region_type {
            RegionType::Heap => "heap".to_string(),
            RegionType::Stack => "stack".to_string(),
            RegionType::Exe => format!("exe:{}", truncate_filename(&entry.filename)),
            RegionType::Code => format!("code:{}", truncate_filename(&entry.filename)),
            RegionType::Misc => "unk".to_string(),
        }
    }
}

fn truncate_filename(filename: &str) -> String {
    if filename.chars().count() <= FILENAME_DISPLAY_WIDTH {
        filename.to_string()
    } else {
        let tail: String = filename
            .chars()
            .rev()
            .take(FILENAME_DISPLAY_WIDTH.saturating_sub(1))
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        format!("\u{2026}{}", tail)
    }
}

/// An allow-set of [`RegionType`]s. An empty set means "allow everything" —
/// the filter is inert until the caller opts into restricting it.
#[derive(Clone, Debug, Default)]
pub struct RegionFilter {
    allowed: Vec<RegionType>,
}

impl RegionFilter {
    pub fn new(allowed: Vec<RegionType>) -> Self {
        RegionFilter { allowed }
    }

    pub fn allow_all() -> Self {
        RegionFilter { allowed: Vec::new() }
    }

    pub fn is_region_allowed(
        &self,
        region: &Region,
    ) -> bool {
        self.allowed.is_empty() || self.allowed.contains(&region.region_type)
    }

    pub fn is_address_allowed(
        &self,
        addr: usize,
        classifier: &RegionClassifier,
    ) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        match classifier.region_type_at(addr) {
            Some(region_type) => self.allowed.contains(&region_type),
            None => self.allowed.contains(&RegionType::Misc),
        }
    }

    pub fn filter_regions(
        &self,
        regions: Vec<Region>,
    ) -> Vec<Region> {
        regions.into_iter().filter(|r| self.is_region_allowed(r)).collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn region(
        id: usize,
        start: usize,
        end: usize,
        region_type: RegionType,
        filename: &str,
    ) -> Region {
        Region {
            id,
            start,
            end,
            writable: false,
            region_type,
            load_addr: start,
            filename: filename.to_string(),
        }
    }

    #[test]
    fn classify_labels_match_region_type() {
        let regions = vec![
            region(0, 0x1000, 0x2000, RegionType::Heap, ""),
            region(1, 0x2000, 0x3000, RegionType::Stack, ""),
            region(2, 0x3000, 0x4000, RegionType::Exe, "/bin/target"),
            region(3, 0x4000, 0x5000, RegionType::Misc, ""),
        ];
        let classifier = RegionClassifier::new(&regions);

        assert_eq!(classifier.classify(0x1500), "heap");
        assert_eq!(classifier.classify(0x2500), "stack");
        assert_eq!(classifier.classify(0x3500), "exe:/bin/target");
        assert_eq!(classifier.classify(0x4500), "unk");
        assert_eq!(classifier.classify(0x9999), "unk");
    }

    #[test]
    fn long_filenames_are_truncated_from_the_left() {
        let long_name = "/usr/lib/x86_64-linux-gnu/some-really-long-library-name.so";
        let regions = vec![region(0, 0x1000, 0x2000, RegionType::Code, long_name)];
        let classifier = RegionClassifier::new(&regions);

        let label = classifier.classify(0x1500);
        assert!(label.starts_with("code:\u{2026}"));
        assert!(label.len() < long_name.len() + "code:".len());
    }

    #[test]
    fn empty_filter_allows_everything() {
        let filter = RegionFilter::allow_all();
        let r = region(0, 0, 0x1000, RegionType::Misc, "");
        assert!(filter.is_region_allowed(&r));
    }

    #[test]
    fn non_empty_filter_restricts_to_allowed_types() {
        let filter = RegionFilter::new(vec![RegionType::Heap, RegionType::Stack]);
        assert!(filter.is_region_allowed(&region(0, 0, 0x1000, RegionType::Heap, "")));
        assert!(!filter.is_region_allowed(&region(1, 0, 0x1000, RegionType::Code, "x")));
    }

    #[test]
    fn is_address_allowed_consults_classifier() {
        let regions = vec![
            region(0, 0x1000, 0x2000, RegionType::Heap, ""),
            region(1, 0x2000, 0x3000, RegionType::Stack, ""),
        ];
        let classifier = RegionClassifier::new(&regions);
        let filter = RegionFilter::new(vec![RegionType::Heap]);

        assert!(filter.is_address_allowed(0x1500, &classifier));
        assert!(!filter.is_address_allowed(0x2500, &classifier));
        assert!(!filter.is_address_allowed(0x9999, &classifier));
    }

    #[test]
    fn filter_regions_drops_disallowed_entries() {
        let filter = RegionFilter::new(vec![RegionType::Heap]);
        let regions = vec![
            region(0, 0, 0x1000, RegionType::Heap, ""),
            region(1, 0x1000, 0x2000, RegionType::Stack, ""),
        ];
        let filtered = filter.filter_regions(regions);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].region_type, RegionType::Heap);
    }
}
