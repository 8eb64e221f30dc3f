use crate::element::Element;
use crate::error::PackResult;
use crate::pack::{unpack_span, TupleUnpack};
use crate::reader::TupleReader;

/// A decoded tuple that holds per-element byte spans instead of materialized
/// values.
///
/// The input is tokenized once up front; element access runs the typed
/// decoder on just that element's span. This makes it cheap to pull one or
/// two components out of a wide key, or to re-read the same component as
/// different types.
#[derive(Debug, Clone)]
pub struct LazyTuple<'de> {
    input: &'de [u8],
    spans: Vec<(usize, usize)>,
}

impl<'de> LazyTuple<'de> {
    /// Tokenizes a whole tuple encoding into element spans.
    pub fn parse(input: &'de [u8]) -> PackResult<Self> {
        let mut reader = TupleReader::new(input);
        let mut spans = Vec::new();
        loop {
            let start = reader.position();
            match reader.parse_next()? {
                None => break,
                Some(span) => spans.push((start, span.len())),
            }
        }
        Ok(LazyTuple { input, spans })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// True for the empty tuple.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The on-wire bytes of element `index`, type code and terminator
    /// included.
    pub fn raw(&self, index: usize) -> Option<&'de [u8]> {
        self.spans
            .get(index)
            .map(|&(start, len)| &self.input[start..start + len])
    }

    /// Materializes element `index` as `T`.
    ///
    /// # Panics
    ///
    /// Panics when `index` is out of range; use [`len`](LazyTuple::len) or
    /// [`raw`](LazyTuple::raw) to probe.
    pub fn get<T: TupleUnpack<'de>>(&self, index: usize) -> PackResult<T> {
        let (start, len) = self.spans[index];
        unpack_span(&self.input[start..start + len])
    }

    /// Materializes element `index` as a runtime-typed [`Element`].
    pub fn element(&self, index: usize) -> PackResult<Element<'de>> {
        self.get(index)
    }

    /// Materializes every element.
    pub fn elements(&self) -> PackResult<Vec<Element<'de>>> {
        (0..self.len()).map(|i| self.element(i)).collect()
    }

    /// The whole encoding this tuple was parsed from.
    pub fn bytes(&self) -> &'de [u8] {
        self.input
    }
}

impl<'de> PartialEq for LazyTuple<'de> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && (0..self.len()).all(|i| self.raw(i) == other.raw(i))
    }
}
