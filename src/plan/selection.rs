use crate::TubesplitError;

/// Parse a 1-based selection such as `1-3,5` against `total` entries.
///
/// Returns sorted, deduplicated, 1-based indices. Empty input selects everything.
pub fn parse_index_selection(input: &str, total: usize) -> Result<Vec<usize>, TubesplitError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok((1..=total).collect());
    }

    let invalid = |reason: String| {
        TubesplitError::InvalidSelection(format!("{:?}: {}", input, reason))
    };
    let parse_index = |raw: &str| -> Result<usize, TubesplitError> {
        let index: usize = raw
            .trim()
            .parse()
            .map_err(|_| invalid(format!("{:?} is not a number", raw.trim())))?;
        if index == 0 || index > total {
            return Err(invalid(format!("{} is outside 1-{}", index, total)));
        }
        Ok(index)
    };

    let mut selected = Vec::new();
    for part in input.split(',') {
        match part.split_once('-') {
            Some((from, to)) => {
                let (from, to) = (parse_index(from)?, parse_index(to)?);
                if from > to {
                    return Err(invalid(format!("range {}-{} is reversed", from, to)));
                }
                selected.extend(from..=to);
            }
            None => selected.push(parse_index(part)?),
        }
    }

    selected.sort_unstable();
    selected.dedup();
    Ok(selected)
}
