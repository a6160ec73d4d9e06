//! Typed references to named sub-databases.

use crate::env::Environment;
use crate::error::{Cause, Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shelfdb_codec::{CborCodec, Codec};
use shelfdb_engine::{DbFlags, EnvFlags, PutFlags};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::debug;

/// A typed handle to one named sub-database of an [`Environment`].
///
/// `DbRef<K, V>` stores values of type `V` under keys of type `K`. Keys and
/// values are encoded independently with the codec `C` (CBOR by default),
/// and entries are addressed by the encoded key bytes.
///
/// A `DbRef` only exists once [`DbRef::init`] has succeeded, so every
/// reference is bound to a registered sub-database. It borrows its
/// environment and cannot outlive it.
///
/// Each `put` runs in its own write transaction and each `get` in its own
/// read transaction. There is no caching and no retry.
///
/// # Example
///
/// ```no_run
/// use serde::{Deserialize, Serialize};
/// use shelfdb_core::{DbRef, Environment, ErrorKind, Options};
///
/// #[derive(Serialize, Deserialize, PartialEq, Debug)]
/// struct Profile {
///     name: String,
///     age: u32,
/// }
///
/// let env = Environment::new("/var/lib/app", Options::new().max_dbs(2));
/// let profiles: DbRef<'_, u64, Profile> = DbRef::init("profiles", &env)?;
///
/// profiles.put(&7, &Profile { name: "Ada".into(), age: 36 })?;
/// assert_eq!(profiles.get(&7)?.name, "Ada");
///
/// let missing = profiles.get(&8).unwrap_err();
/// assert_eq!(missing.kind(), ErrorKind::GetFailed);
/// # Ok::<(), shelfdb_core::Error>(())
/// ```
pub struct DbRef<'env, K: ?Sized, V, C = CborCodec> {
    id: String,
    env: &'env Environment,
    codec: C,
    _types: PhantomData<fn(&K) -> V>,
}

impl<'env, K, V> DbRef<'env, K, V, CborCodec>
where
    K: Serialize + ?Sized,
    V: Serialize + DeserializeOwned,
{
    /// Binds a reference named `id` to `env` using the CBOR codec.
    ///
    /// Opens the environment if this is the first reference, then registers
    /// the sub-database. Calling it again with the same identifier is safe
    /// and yields an equivalent reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InitFailed`] if the directory cannot be created, the
    /// environment cannot be opened (now or on an earlier attempt), or the
    /// sub-database cannot be registered.
    pub fn init(id: impl Into<String>, env: &'env Environment) -> Result<Self> {
        Self::init_with_codec(id, env, CborCodec)
    }
}

impl<'env, K, V, C> DbRef<'env, K, V, C>
where
    K: Serialize + ?Sized,
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    /// Binds a reference named `id` to `env` using `codec`.
    ///
    /// # Errors
    ///
    /// Same as [`DbRef::init`].
    pub fn init_with_codec(id: impl Into<String>, env: &'env Environment, codec: C) -> Result<Self> {
        let id = id.into();

        let read_only = env.options().flags.contains(EnvFlags::READ_ONLY);
        let registered = env.ensure_open().and_then(|conn| {
            // A read-only environment can only bind names that already exist.
            if read_only {
                conn.view(|txn| {
                    txn.sub_db(&id, DbFlags::CREATE)
                        .map(|_| ())
                        .map_err(|err| Cause::SubDb(Arc::new(err)))
                })
            } else {
                conn.update(|txn| {
                    txn.sub_db(&id, DbFlags::CREATE)
                        .map(|_| ())
                        .map_err(|err| Cause::SubDb(Arc::new(err)))
                })
            }
        });

        if let Err(cause) = registered {
            env.diag(|| debug!(id = %id, error = %cause, "reference initialization failed"));
            return Err(Error::init(&id, cause));
        }

        env.diag(|| debug!(id = %id, codec = C::NAME, "reference initialized"));
        Ok(Self {
            id,
            env,
            codec,
            _types: PhantomData,
        })
    }

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PutFailed`] if encoding or the engine write fails,
    /// or if the environment has been closed. Nothing is written in that
    /// case.
    pub fn put(&self, key: &K, value: &V) -> Result<()> {
        self.write(key, value).map_err(|cause| Error::put(&self.id, cause))
    }

    /// Returns the value stored under `key`.
    ///
    /// A missing key is a failure like any other; use
    /// [`Error::is_not_found`] to tell it apart if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GetFailed`] if the key is absent, the stored bytes
    /// do not decode as `V`, encoding fails, or the environment has been
    /// closed.
    pub fn get(&self, key: &K) -> Result<V> {
        self.read(key).map_err(|cause| Error::get(&self.id, cause))
    }

    /// Returns the reference identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the environment this reference is bound to.
    #[must_use]
    pub fn env(&self) -> &'env Environment {
        self.env
    }

    /// Returns the codec.
    #[must_use]
    pub fn codec(&self) -> &C {
        &self.codec
    }

    fn write(&self, key: &K, value: &V) -> std::result::Result<(), Cause> {
        let conn = self.env.connection()?;
        conn.update(|txn| {
            let db = txn
                .sub_db(&self.id, DbFlags::empty())
                .map_err(|err| Cause::SubDb(Arc::new(err)))?;
            let key = self.codec.encode(key).map_err(Cause::EncodeKey)?;
            let value = self.codec.encode(value).map_err(Cause::EncodeValue)?;
            txn.put(db, &key, &value, PutFlags::empty())
                .map_err(|err| Cause::Write(Arc::new(err)))
        })
    }

    fn read(&self, key: &K) -> std::result::Result<V, Cause> {
        let conn = self.env.connection()?;
        conn.view(|txn| {
            let db = txn
                .sub_db(&self.id, DbFlags::empty())
                .map_err(|err| Cause::SubDb(Arc::new(err)))?;
            let key = self.codec.encode(key).map_err(Cause::EncodeKey)?;
            let raw = txn
                .get(db, &key)
                .map_err(|err| Cause::Read(Arc::new(err)))?;
            self.codec.decode(raw).map_err(Cause::DecodeValue)
        })
    }
}

impl<K: ?Sized, V, C: Clone> Clone for DbRef<'_, K, V, C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            env: self.env,
            codec: self.codec.clone(),
            _types: PhantomData,
        }
    }
}

impl<K: ?Sized, V, C> fmt::Debug for DbRef<'_, K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbRef")
            .field("id", &self.id)
            .field("path", &self.env.path())
            .field("key", &std::any::type_name::<K>())
            .field("value", &std::any::type_name::<V>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::options::Options;
    use serde::Deserialize;
    use shelfdb_codec::JsonCodec;
    use shelfdb_engine::EngineError;
    use tempfile::{tempdir, TempDir};

    fn env(max_dbs: u32) -> (TempDir, Environment) {
        let dir = tempdir().unwrap();
        let env = Environment::new(dir.path().join("env"), Options::new().max_dbs(max_dbs));
        (dir, env)
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        item: String,
        quantity: u32,
    }

    #[test]
    fn put_and_get() {
        let (_dir, env) = env(1);
        let users: DbRef<'_, str, String> = DbRef::init("users", &env).unwrap();

        users.put("alice", &"hello".to_string()).unwrap();
        assert_eq!(users.get("alice").unwrap(), "hello");
    }

    #[test]
    fn missing_key_is_get_failed() {
        let (_dir, env) = env(1);
        let users: DbRef<'_, str, String> = DbRef::init("users", &env).unwrap();
        users.put("alice", &"hello".to_string()).unwrap();

        let err = users.get("bob").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GetFailed);
        assert!(err.is_not_found());
        assert_eq!(err.id(), "users");
    }

    #[test]
    fn struct_values() {
        let (_dir, env) = env(1);
        let orders: DbRef<'_, u64, Order> = DbRef::init("orders", &env).unwrap();
        let order = Order {
            item: "widget".into(),
            quantity: 3,
        };

        orders.put(&1, &order).unwrap();
        assert_eq!(orders.get(&1).unwrap(), order);
    }

    #[test]
    fn json_codec() {
        let (_dir, env) = env(1);
        let orders: DbRef<'_, str, Order, JsonCodec> =
            DbRef::init_with_codec("orders", &env, JsonCodec).unwrap();
        let order = Order {
            item: "bolt".into(),
            quantity: 12,
        };

        orders.put("o-1", &order).unwrap();
        assert_eq!(orders.get("o-1").unwrap(), order);
        assert_eq!(orders.codec(), &JsonCodec);
    }

    #[test]
    fn decoding_into_other_type_fails() {
        let (_dir, env) = env(1);
        let as_text: DbRef<'_, str, String> = DbRef::init("mixed", &env).unwrap();
        as_text.put("k", &"not a number".to_string()).unwrap();

        let as_number: DbRef<'_, str, u64> = DbRef::init("mixed", &env).unwrap();
        let err = as_number.get("k").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::GetFailed);
        assert!(matches!(err.cause(), Cause::DecodeValue(_)));
    }

    #[test]
    fn second_identifier_needs_room() {
        let (_dir, env) = env(1);
        let _first: DbRef<'_, str, String> = DbRef::init("first", &env).unwrap();

        let err = DbRef::<'_, str, String>::init("second", &env).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InitFailed);
        assert!(matches!(
            err.cause(),
            Cause::SubDb(engine) if matches!(**engine, EngineError::DbsFull { max: 1 })
        ));
    }

    #[test]
    fn closed_environment_fails_put_and_get() {
        let (_dir, env) = env(1);
        let users: DbRef<'_, str, String> = DbRef::init("users", &env).unwrap();
        users.put("alice", &"hello".to_string()).unwrap();
        env.close().unwrap();

        let put = users.put("alice", &"again".to_string()).unwrap_err();
        assert_eq!(put.kind(), ErrorKind::PutFailed);
        let get = users.get("alice").unwrap_err();
        assert_eq!(get.kind(), ErrorKind::GetFailed);
        assert!(!get.is_not_found());
    }

    #[test]
    fn oversized_key_is_put_failed() {
        let (_dir, env) = env(1);
        let users: DbRef<'_, str, String> = DbRef::init("users", &env).unwrap();
        let key = "k".repeat(shelfdb_engine::MAX_KEY_SIZE + 1);

        let err = users.put(&key, &"v".to_string()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PutFailed);
        assert!(matches!(
            err.cause(),
            Cause::Write(engine) if matches!(**engine, EngineError::BadValSize { .. })
        ));
        assert_eq!(err.id(), "users");
    }

    #[test]
    fn unit_key() {
        let (_dir, env) = env(1);
        let single: DbRef<'_, (), String> = DbRef::init("single", &env).unwrap();

        single.put(&(), &"only".to_string()).unwrap();
        assert_eq!(single.get(&()).unwrap(), "only");
    }

    #[test]
    fn clone_and_debug() {
        let (_dir, env) = env(1);
        let users: DbRef<'_, str, String> = DbRef::init("users", &env).unwrap();
        let copy = users.clone();

        users.put("k", &"v".to_string()).unwrap();
        assert_eq!(copy.get("k").unwrap(), "v");
        assert_eq!(copy.id(), "users");
        assert!(std::ptr::eq(copy.env(), &env));
        assert!(format!("{users:?}").contains("users"));
    }
}
