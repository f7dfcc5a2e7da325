use std::sync::Arc;

use indexmap::IndexMap;
use itertools::Itertools;

/// Convert a string label map into the attribute array the instrument API
/// expects.
pub fn key_values(attributes: &IndexMap<String, String>) -> Vec<opentelemetry::KeyValue> {
    attributes
        .iter()
        .map(|att| opentelemetry::KeyValue::new(att.0.clone(), att.1.clone()))
        .collect_vec()
}

/// A counter with a fixed label set bound at construction time, so emission
/// sites stay a plain `add(value)`.
#[derive(Debug, Clone)]
pub struct AttributedCounter<C, T> {
    pub inner: C,

    pub attributes: Arc<IndexMap<String, String>>,

    _marker: std::marker::PhantomData<T>,
}

impl<T> AttributedCounter<opentelemetry::metrics::Counter<T>, T> {
    pub fn add(&self, value: T) {
        self.inner.add(value, &key_values(&self.attributes));
    }
}

pub trait WithAttributes<T> {
    fn with_attributes(
        self,
        attributes: Arc<IndexMap<String, String>>,
    ) -> AttributedCounter<Self, T>
    where
        Self: Sized;
}

impl<T> WithAttributes<T> for opentelemetry::metrics::Counter<T> {
    fn with_attributes(
        self,
        attributes: Arc<IndexMap<String, String>>,
    ) -> AttributedCounter<Self, T> {
        AttributedCounter::<Self, T> {
            inner: self,
            attributes,
            _marker: Default::default(),
        }
    }
}
