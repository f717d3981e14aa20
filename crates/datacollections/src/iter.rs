//! Decoding iteration over collections.

use crate::collection::decode;
use crate::field_value::FieldValue;
use datacollections_core::{Key, Serializer, Value};
use indexmap::map;
use std::iter::FusedIterator;
use std::rc::Rc;

/// Iterator over the elements of an [`ArrayCollection`](crate::ArrayCollection).
///
/// Each value is decoded on the fly, exactly like
/// [`ArrayCollection::get_value`](crate::ArrayCollection::get_value): stored
/// composites come out as fresh collections. A new iterator always starts
/// from the first element.
pub struct CollectionIter<'a> {
    inner: map::Iter<'a, Key, Value>,
    serializer: &'a Rc<dyn Serializer>,
}

impl<'a> CollectionIter<'a> {
    pub(crate) fn new(inner: map::Iter<'a, Key, Value>, serializer: &'a Rc<dyn Serializer>) -> Self {
        Self { inner, serializer }
    }
}

impl<'a> Iterator for CollectionIter<'a> {
    type Item = (&'a Key, FieldValue);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, raw) = self.inner.next()?;
        Some((key, decode(self.serializer, Some(raw))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl DoubleEndedIterator for CollectionIter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let (key, raw) = self.inner.next_back()?;
        Some((key, decode(self.serializer, Some(raw))))
    }
}

impl ExactSizeIterator for CollectionIter<'_> {}

impl FusedIterator for CollectionIter<'_> {}

#[cfg(test)]
mod tests {
    use crate::{ArrayCollection, FieldValue};
    use datacollections_core::{JsonSerializer, Value};
    use std::rc::Rc;

    #[test]
    fn iteration_decodes_composites() {
        let mut c = ArrayCollection::empty(Rc::new(JsonSerializer::new()));
        c.set_value("title", "Hello").unwrap();
        c.set_value("tags", Value::list(["a", "b"])).unwrap();

        let items: Vec<_> = c.iter().collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].1, FieldValue::Scalar(Value::from("Hello")));
        assert_eq!(items[1].1.as_collection().map(ArrayCollection::len), Some(2));
    }

    #[test]
    fn fresh_iterator_restarts() {
        let mut c = ArrayCollection::empty(Rc::new(JsonSerializer::new()));
        c.set_value(0, 1).unwrap();
        c.set_value(1, 2).unwrap();

        let mut first = c.iter();
        first.next();
        assert_eq!(first.len(), 1);
        assert_eq!(c.iter().count(), 2);
        assert_eq!((&c).into_iter().rev().next().map(|(k, _)| k.to_string()), Some("1".to_string()));
    }
}
