//! Code slice filename classification.
//!
//! Slices are named `<prefix>_<source>.cpp_<function>.cpp`, e.g.
//! `z3_nla_throttle.cpp_insert_new_impl.cpp`. The prefix stops at the first
//! usable `_`, the source name at the first usable `.cpp_` marker, and the
//! function name runs to the final `.cpp`. None of the three may be empty.

const EXTENSION: &str = ".cpp";
const MARKER: &str = ".cpp_";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceName {
    pub prefix: String,
    pub source_name: String,
    pub function_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Not a `.cpp` file at all.
    NotCpp,
    /// A `.cpp` file that does not follow the slice naming convention.
    Unmatched,
    Matched(SliceName),
}

impl Classification {
    pub fn matched(self) -> Option<SliceName> {
        match self {
            Classification::Matched(name) => Some(name),
            _ => None,
        }
    }
}

pub fn classify(file_name: &str) -> Classification {
    if !file_name.ends_with(EXTENSION) {
        return Classification::NotCpp;
    }

    match parse_slice_name(file_name) {
        Some(name) => Classification::Matched(name),
        None => Classification::Unmatched,
    }
}

/// Leftmost split with backtracking: try each `_` as the prefix end in
/// order, and for each, each `.cpp_` marker as the source end in order.
fn parse_slice_name(file_name: &str) -> Option<SliceName> {
    let stem_end = file_name.len() - EXTENSION.len();

    for (sep, _) in file_name.match_indices('_') {
        if sep == 0 {
            continue;
        }

        let source_start = sep + 1;
        let rest = &file_name[source_start..];

        for (offset, _) in rest.match_indices(MARKER) {
            if offset == 0 {
                continue;
            }

            let marker_at = source_start + offset;
            let function_start = marker_at + MARKER.len();
            if function_start >= stem_end {
                continue;
            }

            return Some(SliceName {
                prefix: file_name[..sep].to_string(),
                source_name: file_name[source_start..marker_at].to_string(),
                function_name: file_name[function_start..stem_end].to_string(),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(prefix: &str, source: &str, function: &str) -> Classification {
        Classification::Matched(SliceName {
            prefix: prefix.into(),
            source_name: source.into(),
            function_name: function.into(),
        })
    }

    #[test]
    fn splits_canonical_name() {
        assert_eq!(classify("foo_bar.cpp_baz.cpp"), name("foo", "bar", "baz"));
    }

    #[test]
    fn wrong_extension_is_not_cpp() {
        assert_eq!(classify("a.txt"), Classification::NotCpp);
        assert_eq!(classify("foo_bar.cpp_baz.hpp"), Classification::NotCpp);
        assert_eq!(classify("foo_bar.cpp_baz.CPP"), Classification::NotCpp);
    }

    #[test]
    fn missing_marker_is_unmatched() {
        assert_eq!(classify("nopattern.cpp"), Classification::Unmatched);
        assert_eq!(classify("foo_bar.cpp"), Classification::Unmatched);
        assert_eq!(classify("foo_bar_baz.cpp"), Classification::Unmatched);
    }

    #[test]
    fn prefix_is_shortest_and_source_keeps_underscores() {
        assert_eq!(
            classify("z3_nla_throttle.cpp_insert_new_impl.cpp"),
            name("z3", "nla_throttle", "insert_new_impl")
        );
    }

    #[test]
    fn function_runs_to_final_extension() {
        assert_eq!(
            classify("a_b.cpp_c.cpp_d.cpp"),
            name("a", "b", "c.cpp_d")
        );
    }

    #[test]
    fn leading_underscore_belongs_to_prefix() {
        assert_eq!(classify("_a_b.cpp_c.cpp"), name("_a", "b", "c"));
    }

    #[test]
    fn empty_segments_are_rejected() {
        assert_eq!(classify("a_.cpp_x.cpp"), Classification::Unmatched);
        assert_eq!(classify("a_b.cpp_.cpp"), Classification::Unmatched);
        assert_eq!(classify("_b.cpp_c.cpp"), Classification::Unmatched);
        assert_eq!(classify(".cpp"), Classification::Unmatched);
    }

    #[test]
    fn skips_marker_that_would_leave_source_empty() {
        assert_eq!(
            classify("a_.cpp_b_c.cpp_d.cpp"),
            name("a", ".cpp_b_c", "d")
        );
        assert_eq!(
            classify("a_b.cpp_x.cpp_.cpp"),
            name("a", "b", "x.cpp_")
        );
    }

    #[test]
    fn matched_accessor() {
        assert!(classify("nopattern.cpp").matched().is_none());
        assert_eq!(
            classify("p_s.cpp_f.cpp").matched().map(|n| n.function_name),
            Some("f".to_string())
        );
    }
}
