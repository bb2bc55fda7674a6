//! Order-restoring reassembly of fetched segments.

use bytes::Bytes;

use crate::fetch::FetchSummary;

/// Segment payloads in playlist order, no gaps. Only constructible through
/// [`assemble`], which guarantees completeness.
#[derive(Debug)]
pub struct AssembledStream {
    payloads: Vec<Bytes>,
}

impl AssembledStream {
    pub fn payloads(&self) -> &[Bytes] {
        &self.payloads
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn total_bytes(&self) -> u64 {
        self.payloads.iter().map(|p| p.len() as u64).sum()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AssembleError {
    #[error("assembly incomplete: missing or failed segment indices {missing:?}")]
    Incomplete { missing: Vec<usize> },
}

/// Pure projection from the per-index result map into playlist order.
/// Depends only on the stored indices, never on fetch completion order.
pub fn assemble(summary: FetchSummary) -> Result<AssembledStream, AssembleError> {
    let FetchSummary { mut results, total } = summary;

    let missing: Vec<usize> = (0..total)
        .filter(|index| !matches!(results.get(index), Some(Ok(_))))
        .collect();
    if !missing.is_empty() {
        return Err(AssembleError::Incomplete { missing });
    }

    let mut payloads = Vec::with_capacity(total);
    for index in 0..total {
        if let Some(Ok(bytes)) = results.remove(&index) {
            payloads.push(bytes);
        }
    }
    Ok(AssembledStream { payloads })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FailureCause;
    use std::collections::BTreeMap;

    fn payload(index: usize) -> Bytes {
        Bytes::from(format!("segment-{index}"))
    }

    fn summary_from(order: &[usize], total: usize) -> FetchSummary {
        let mut results = BTreeMap::new();
        for &index in order {
            results.insert(index, Ok(payload(index)));
        }
        FetchSummary { results, total }
    }

    #[test]
    fn output_is_independent_of_completion_order() {
        let sequential = assemble(summary_from(&[0, 1, 2, 3, 4], 5)).unwrap();
        let shuffled = assemble(summary_from(&[3, 0, 4, 2, 1], 5)).unwrap();
        assert_eq!(sequential.payloads(), shuffled.payloads());
        for (index, bytes) in sequential.payloads().iter().enumerate() {
            assert_eq!(bytes, &payload(index));
        }
    }

    #[test]
    fn missing_index_is_reported_exactly() {
        let err = assemble(summary_from(&[0, 1, 3, 4], 5)).unwrap_err();
        let AssembleError::Incomplete { missing } = err;
        assert_eq!(missing, vec![2]);
    }

    #[test]
    fn failed_index_counts_as_missing() {
        let mut summary = summary_from(&[0, 2], 3);
        summary.results.insert(1, Err(FailureCause::Timeout));
        let AssembleError::Incomplete { missing } = assemble(summary).unwrap_err();
        assert_eq!(missing, vec![1]);
    }

    #[test]
    fn multiple_gaps_are_listed_in_ascending_order() {
        let AssembleError::Incomplete { missing } =
            assemble(summary_from(&[1, 3], 6)).unwrap_err();
        assert_eq!(missing, vec![0, 2, 4, 5]);
    }

    #[test]
    fn total_bytes_sums_payloads() {
        let stream = assemble(summary_from(&[0, 1], 2)).unwrap();
        assert_eq!(stream.total_bytes(), ("segment-0".len() * 2) as u64);
        assert_eq!(stream.len(), 2);
        assert!(!stream.is_empty());
    }
}
