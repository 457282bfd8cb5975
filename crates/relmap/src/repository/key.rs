use crate::value::Value;
use uuid::Uuid;

/// A key type a [`Repository`](super::Repository) can be addressed by.
///
/// Single-column keys are plain scalars; composite keys are tuples (or a
/// `Vec<Value>`) listing the values in key column order.
pub trait EntityKey: Send + Sync {
    fn key_values(&self) -> Vec<Value>;
}

macro_rules! impl_scalar_key {
    ($($ty:ty),* $(,)?) => {
        $(
            impl EntityKey for $ty {
                fn key_values(&self) -> Vec<Value> {
                    vec![Value::from(self.clone())]
                }
            }
        )*
    };
}

impl_scalar_key!(String, i16, i32, i64, Uuid, Value);

impl EntityKey for &str {
    fn key_values(&self) -> Vec<Value> {
        vec![Value::from(*self)]
    }
}

impl EntityKey for Vec<Value> {
    fn key_values(&self) -> Vec<Value> {
        self.clone()
    }
}

impl<A, B> EntityKey for (A, B)
where
    A: Into<Value> + Clone + Send + Sync,
    B: Into<Value> + Clone + Send + Sync,
{
    fn key_values(&self) -> Vec<Value> {
        vec![self.0.clone().into(), self.1.clone().into()]
    }
}

impl<A, B, C> EntityKey for (A, B, C)
where
    A: Into<Value> + Clone + Send + Sync,
    B: Into<Value> + Clone + Send + Sync,
    C: Into<Value> + Clone + Send + Sync,
{
    fn key_values(&self) -> Vec<Value> {
        vec![
            self.0.clone().into(),
            self.1.clone().into(),
            self.2.clone().into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_keys() {
        assert_eq!("tag1".to_string().key_values(), vec![Value::from("tag1")]);
        assert_eq!(42_i64.key_values(), vec![Value::BigInt(42)]);
        assert_eq!("x".key_values(), vec![Value::Text("x".into())]);
    }

    #[test]
    fn composite_keys_keep_column_order() {
        let key = ("ref1".to_string(), "API".to_string());
        assert_eq!(key.key_values(), vec![Value::from("ref1"), Value::from("API")]);
        let key = (1_i32, "a", 2_i64);
        assert_eq!(
            key.key_values(),
            vec![Value::Integer(1), Value::from("a"), Value::BigInt(2)]
        );
    }
}
