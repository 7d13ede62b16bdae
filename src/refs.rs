//! Reference designator cell expansion.

/// Split a cell naming several designators ("R4, R5/R6 R7") into refs.
///
/// `,`, `;`, `/` and whitespace are all separators. Order is preserved and
/// duplicates are kept; callers treat the result as a set.
pub fn expand(cell: &str) -> Vec<String> {
    cell.split(|c: char| c == ',' || c == ';' || c == '/' || c.is_whitespace())
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
