//! In-memory tenant record store. Process-lifetime only: everything is lost
//! on restart. All entities are append-only; nothing is updated or removed.
//!
//! Every lookup that takes an owner combines the id match and the ownership
//! match in a single predicate, so a record owned by another user is
//! indistinguishable from one that does not exist.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use evosaas_types::models::{Instance, InstanceStatus, Message, MessageStatus, Plan, Role, User};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user already exists")]
    DuplicateEmail,
    #[error("instance not found")]
    InstanceNotFound,
    #[error("store lock poisoned")]
    Lock,
}

#[derive(Default)]
struct StoreInner {
    users: HashMap<Uuid, User>,
    users_by_email: HashMap<String, Uuid>,
    instances: HashMap<Uuid, Instance>,
    instances_by_owner: HashMap<Uuid, Vec<Uuid>>,
    messages: HashMap<Uuid, Message>,
    messages_by_instance: HashMap<Uuid, Vec<Uuid>>,
    /// Global insertion order of messages; listings preserve it.
    message_order: Vec<Uuid>,
}

/// Id-keyed entity maps plus secondary indexes, behind one mutex so the store
/// is safe under a multi-threaded runtime. A persistent backend can replace
/// this without touching handler logic.
pub struct Store {
    inner: Mutex<StoreInner>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StoreInner::default()),
        }
    }

    fn with_inner<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut StoreInner) -> Result<T, StoreError>,
    {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Lock)?;
        f(&mut inner)
    }

    // -- Users --

    /// Registers a new user. The email must not already be taken; the
    /// comparison is a case-sensitive exact match.
    pub fn create_user(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        self.with_inner(|inner| {
            if inner.users_by_email.contains_key(email) {
                return Err(StoreError::DuplicateEmail);
            }

            let user = User {
                id: Uuid::new_v4(),
                email: email.to_owned(),
                name: name.to_owned(),
                password_hash: password_hash.to_owned(),
                role: Role::User,
                plan: Plan::Starter,
                created_at: Utc::now(),
            };

            inner.users_by_email.insert(user.email.clone(), user.id);
            inner.users.insert(user.id, user.clone());
            Ok(user)
        })
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.with_inner(|inner| {
            Ok(inner
                .users_by_email
                .get(email)
                .and_then(|id| inner.users.get(id))
                .cloned())
        })
    }

    pub fn user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.with_inner(|inner| Ok(inner.users.get(&id).cloned()))
    }

    // -- Instances --

    pub fn create_instance(&self, owner: Uuid, name: &str) -> Result<Instance, StoreError> {
        self.with_inner(|inner| {
            let instance = Instance {
                id: Uuid::new_v4(),
                user_id: owner,
                instance_name: name.to_owned(),
                status: InstanceStatus::Pending,
                phone_number: None,
                qr_code: None,
                created_at: Utc::now(),
            };

            inner
                .instances_by_owner
                .entry(owner)
                .or_default()
                .push(instance.id);
            inner.instances.insert(instance.id, instance.clone());
            Ok(instance)
        })
    }

    /// All instances owned by `owner`, in creation order.
    pub fn instances_for_owner(&self, owner: Uuid) -> Result<Vec<Instance>, StoreError> {
        self.with_inner(|inner| {
            let ids = inner.instances_by_owner.get(&owner);
            Ok(ids
                .map(|ids| {
                    ids.iter()
                        .filter_map(|id| inner.instances.get(id))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default())
        })
    }

    /// The instance with this id, only if `owner` owns it.
    pub fn instance_for_owner(
        &self,
        owner: Uuid,
        instance_id: Uuid,
    ) -> Result<Option<Instance>, StoreError> {
        self.with_inner(|inner| {
            Ok(inner
                .instances
                .get(&instance_id)
                .filter(|instance| instance.user_id == owner)
                .cloned())
        })
    }

    // -- Messages --

    /// Records an outbound message against one of `owner`'s instances.
    /// There is no gateway call behind this; the record is created with
    /// status `sent` and never transitions.
    pub fn create_message(
        &self,
        owner: Uuid,
        instance_id: Uuid,
        phone_number: &str,
        body: &str,
    ) -> Result<Message, StoreError> {
        self.with_inner(|inner| {
            let owned = inner
                .instances
                .get(&instance_id)
                .is_some_and(|instance| instance.user_id == owner);
            if !owned {
                return Err(StoreError::InstanceNotFound);
            }

            let message = Message {
                id: Uuid::new_v4(),
                instance_id,
                phone_number: phone_number.to_owned(),
                message: body.to_owned(),
                status: MessageStatus::Sent,
                created_at: Utc::now(),
            };

            inner
                .messages_by_instance
                .entry(instance_id)
                .or_default()
                .push(message.id);
            inner.message_order.push(message.id);
            inner.messages.insert(message.id, message.clone());
            Ok(message)
        })
    }

    /// All messages belonging to instances owned by `owner`, in insertion
    /// order, optionally restricted to one instance id. The filter is a pure
    /// predicate: an id the owner does not hold yields an empty list.
    pub fn messages_for_owner(
        &self,
        owner: Uuid,
        instance_id: Option<Uuid>,
    ) -> Result<Vec<Message>, StoreError> {
        self.with_inner(|inner| match instance_id {
            // Per-instance index preserves the same insertion order, so the
            // filtered listing is an exact subset of the unfiltered one.
            Some(wanted) => {
                let owned = inner
                    .instances
                    .get(&wanted)
                    .is_some_and(|instance| instance.user_id == owner);
                if !owned {
                    return Ok(Vec::new());
                }
                Ok(inner
                    .messages_by_instance
                    .get(&wanted)
                    .map(|ids| {
                        ids.iter()
                            .filter_map(|id| inner.messages.get(id))
                            .cloned()
                            .collect()
                    })
                    .unwrap_or_default())
            }
            None => Ok(inner
                .message_order
                .iter()
                .filter_map(|id| inner.messages.get(id))
                .filter(|message| {
                    inner
                        .instances
                        .get(&message.instance_id)
                        .is_some_and(|instance| instance.user_id == owner)
                })
                .cloned()
                .collect()),
        })
    }
}
