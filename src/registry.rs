//! The check registry.
//!
//! Maps slugs to check implementations and entity kinds to the checks
//! that must re-run when entities of that kind change. Populated
//! synchronously at startup, read on every trigger dispatch afterwards.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::check::{Check, TriggerSpec};
use crate::error::{RegistryError, VigilError, VigilResult};
use crate::identity::{CheckSlug, EntityKind};

fn lock_err(context: &'static str) -> VigilError {
    VigilError::internal(format!("poisoned lock: {context}"))
}

/// Outcome of a successful registration.
#[derive(Debug, Clone)]
pub struct RegisteredCheck {
    /// The derived slug the check is now reachable under.
    pub slug: CheckSlug,
    /// Entity kinds this check's wired triggers listen to, deduplicated
    /// in declaration order. The runtime subscribes to each kind it has
    /// not seen before.
    pub trigger_kinds: Vec<EntityKind>,
}

struct TriggerBinding {
    slug: CheckSlug,
    spec: TriggerSpec,
}

#[derive(Default)]
struct RegistryState {
    checks: HashMap<CheckSlug, Arc<dyn Check>>,
    triggers: HashMap<EntityKind, Vec<TriggerBinding>>,
}

/// Registry of check implementations.
///
/// An explicitly constructed value owned by the engine; there is no
/// process-global registry. Checks are registered once and never
/// removed.
#[derive(Default)]
pub struct CheckRegistry {
    state: RwLock<RegistryState>,
}

impl CheckRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a check under its derived slug.
    ///
    /// Declared triggers are wired into the entity-kind index. A
    /// trigger is skipped with a warning (registration still succeeds)
    /// when the check exposes no [`crate::check::Reactor`], when the
    /// trigger name is empty, or when it duplicates an earlier
    /// `(name, entity)` declaration of the same check.
    ///
    /// # Errors
    ///
    /// Fails with [`RegistryError::InvalidMeta`] when the namespace or
    /// name is empty, and with [`RegistryError::DuplicateSlug`] when a
    /// check is already registered under the same slug.
    pub fn register(&self, check: Arc<dyn Check>) -> VigilResult<RegisteredCheck> {
        let meta = check.meta();
        if meta.namespace.trim().is_empty() {
            return Err(RegistryError::InvalidMeta {
                reason: "namespace cannot be empty".to_string(),
            }
            .into());
        }
        if meta.name.trim().is_empty() {
            return Err(RegistryError::InvalidMeta {
                reason: "name cannot be empty".to_string(),
            }
            .into());
        }
        let slug = meta.slug();

        let (wired, trigger_kinds) = wire_triggers(&slug, check.as_ref());

        let mut state = self.state.write().map_err(|_| lock_err("registry.register"))?;
        if state.checks.contains_key(&slug) {
            return Err(RegistryError::DuplicateSlug { slug }.into());
        }
        state.checks.insert(slug.clone(), check);
        for spec in wired {
            state
                .triggers
                .entry(spec.entity.clone())
                .or_default()
                .push(TriggerBinding {
                    slug: slug.clone(),
                    spec,
                });
        }

        Ok(RegisteredCheck {
            slug,
            trigger_kinds,
        })
    }

    /// Looks up a check by slug.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned registry lock.
    pub fn get_check(&self, slug: &CheckSlug) -> VigilResult<Option<Arc<dyn Check>>> {
        let state = self.state.read().map_err(|_| lock_err("registry.get_check"))?;
        Ok(state.checks.get(slug).cloned())
    }

    /// Returns the checks listening to mutations of `kind`, in
    /// registration order, or `None` when no check listens to it.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned registry lock.
    pub fn checks_for_entity(
        &self,
        kind: &EntityKind,
    ) -> VigilResult<Option<Vec<Arc<dyn Check>>>> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("registry.checks_for_entity"))?;
        let Some(bindings) = state.triggers.get(kind) else {
            return Ok(None);
        };

        let mut seen: HashSet<&CheckSlug> = HashSet::new();
        let mut checks = Vec::new();
        for binding in bindings {
            if seen.insert(&binding.slug) {
                if let Some(check) = state.checks.get(&binding.slug) {
                    checks.push(Arc::clone(check));
                }
            }
        }
        Ok(Some(checks))
    }

    /// Returns the wired `(check, trigger)` pairs for mutations of
    /// `kind`, in registration order.
    ///
    /// Only triggers accepted at registration appear here; this is what
    /// trigger dispatch iterates, so registration-time skips hold.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned registry lock.
    pub fn triggers_for_entity(
        &self,
        kind: &EntityKind,
    ) -> VigilResult<Vec<(Arc<dyn Check>, TriggerSpec)>> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("registry.triggers_for_entity"))?;
        let Some(bindings) = state.triggers.get(kind) else {
            return Ok(Vec::new());
        };

        let mut pairs = Vec::with_capacity(bindings.len());
        for binding in bindings {
            if let Some(check) = state.checks.get(&binding.slug) {
                pairs.push((Arc::clone(check), binding.spec.clone()));
            }
        }
        Ok(pairs)
    }

    /// Returns every registered check, in no particular order.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned registry lock.
    pub fn all_checks(&self) -> VigilResult<Vec<Arc<dyn Check>>> {
        let state = self.state.read().map_err(|_| lock_err("registry.all_checks"))?;
        Ok(state.checks.values().cloned().collect())
    }

    /// Returns every registered slug, sorted.
    ///
    /// # Errors
    ///
    /// Fails only on a poisoned registry lock.
    pub fn slugs(&self) -> VigilResult<Vec<CheckSlug>> {
        let state = self.state.read().map_err(|_| lock_err("registry.slugs"))?;
        let mut slugs: Vec<CheckSlug> = state.checks.keys().cloned().collect();
        slugs.sort();
        Ok(slugs)
    }
}

fn wire_triggers(slug: &CheckSlug, check: &dyn Check) -> (Vec<TriggerSpec>, Vec<EntityKind>) {
    let declared = check.triggers();
    if declared.is_empty() {
        return (Vec::new(), Vec::new());
    }

    if check.reactor().is_none() {
        for spec in &declared {
            tracing::warn!(
                slug = %slug,
                trigger = %spec.name,
                entity = %spec.entity,
                "declared trigger has no reactor; skipping"
            );
        }
        return (Vec::new(), Vec::new());
    }

    let mut wired = Vec::with_capacity(declared.len());
    let mut kinds = Vec::new();
    let mut seen: HashSet<(String, EntityKind)> = HashSet::new();
    for spec in declared {
        if spec.name.trim().is_empty() {
            tracing::warn!(slug = %slug, entity = %spec.entity, "trigger name is empty; skipping");
            continue;
        }
        if !seen.insert((spec.name.clone(), spec.entity.clone())) {
            tracing::warn!(
                slug = %slug,
                trigger = %spec.name,
                entity = %spec.entity,
                "duplicate trigger declaration; skipping"
            );
            continue;
        }
        if !kinds.contains(&spec.entity) {
            kinds.push(spec.entity.clone());
        }
        wired.push(spec);
    }
    (wired, kinds)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::changes::EntityChange;
    use crate::check::{CheckMeta, Reactor, Subject};
    use crate::config::CheckConfig;
    use crate::error::VigilResult;
    use crate::identity::Identifier;
    use crate::status::Status;
    use crate::value::Value;

    struct PassReactor;

    impl Reactor for PassReactor {
        fn payload(&self, _trigger: &TriggerSpec, _change: &EntityChange) -> Option<Subject> {
            Some(Subject::new(Value::Null))
        }
    }

    struct TestCheck {
        meta: CheckMeta,
        triggers: Vec<TriggerSpec>,
        reactor: Option<PassReactor>,
    }

    impl TestCheck {
        fn plain(namespace: &str, name: &str) -> Self {
            Self {
                meta: CheckMeta::new(namespace, name),
                triggers: Vec::new(),
                reactor: None,
            }
        }

        fn with_triggers(mut self, triggers: Vec<TriggerSpec>, wired: bool) -> Self {
            self.triggers = triggers;
            self.reactor = wired.then_some(PassReactor);
            self
        }
    }

    impl Check for TestCheck {
        fn meta(&self) -> CheckMeta {
            self.meta.clone()
        }

        fn generate(&self) -> VigilResult<Box<dyn Iterator<Item = Subject> + '_>> {
            Ok(Box::new(std::iter::empty()))
        }

        fn evaluate(&self, _subject: &Subject, _config: &CheckConfig) -> VigilResult<Status> {
            Ok(Status::Ok)
        }

        fn identifier(&self, _subject: &Subject) -> VigilResult<Identifier> {
            Ok(Identifier::new("only"))
        }

        fn triggers(&self) -> Vec<TriggerSpec> {
            self.triggers.clone()
        }

        fn reactor(&self) -> Option<&dyn Reactor> {
            self.reactor.as_ref().map(|r| r as &dyn Reactor)
        }
    }

    #[test]
    fn test_register_and_get_check() {
        let registry = CheckRegistry::new();
        let registered = registry
            .register(Arc::new(TestCheck::plain("checks", "DiskSpace")))
            .unwrap();
        assert_eq!(registered.slug, CheckSlug::derive("checks", "DiskSpace"));
        assert!(registered.trigger_kinds.is_empty());

        let found = registry.get_check(&registered.slug).unwrap();
        assert!(found.is_some());
        assert!(registry
            .get_check(&CheckSlug::from("checks.Missing"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_slug_fails_loudly() {
        let registry = CheckRegistry::new();
        registry
            .register(Arc::new(TestCheck::plain("checks", "DiskSpace")))
            .unwrap();

        let err = registry
            .register(Arc::new(TestCheck::plain("checks", "DiskSpace")))
            .unwrap_err();
        assert!(err.is_registry());
        assert!(matches!(
            err,
            VigilError::Registry(RegistryError::DuplicateSlug { ref slug })
                if slug.as_str() == "checks.DiskSpace"
        ));
    }

    #[test]
    fn test_empty_meta_is_rejected() {
        let registry = CheckRegistry::new();

        let err = registry
            .register(Arc::new(TestCheck::plain("", "DiskSpace")))
            .unwrap_err();
        assert!(matches!(
            err,
            VigilError::Registry(RegistryError::InvalidMeta { .. })
        ));

        let err = registry
            .register(Arc::new(TestCheck::plain("checks", "  ")))
            .unwrap_err();
        assert!(matches!(
            err,
            VigilError::Registry(RegistryError::InvalidMeta { .. })
        ));
    }

    #[test]
    fn test_unwired_triggers_are_skipped_but_registration_succeeds() {
        let registry = CheckRegistry::new();
        let check = TestCheck::plain("shop", "OrderProcessing").with_triggers(
            vec![TriggerSpec::new("order_saved", "shop.Order")],
            false,
        );

        let registered = registry.register(Arc::new(check)).unwrap();
        assert!(registered.trigger_kinds.is_empty());

        let kind = EntityKind::derive("shop", "Order");
        assert!(registry.checks_for_entity(&kind).unwrap().is_none());
        assert!(registry.triggers_for_entity(&kind).unwrap().is_empty());
        assert!(registry.get_check(&registered.slug).unwrap().is_some());
    }

    #[test]
    fn test_wired_trigger_is_indexed() {
        let registry = CheckRegistry::new();
        let check = TestCheck::plain("shop", "OrderProcessing").with_triggers(
            vec![TriggerSpec::new("order_saved", "shop.Order")],
            true,
        );

        let registered = registry.register(Arc::new(check)).unwrap();
        let kind = EntityKind::derive("shop", "Order");
        assert_eq!(registered.trigger_kinds, vec![kind.clone()]);

        let checks = registry.checks_for_entity(&kind).unwrap().unwrap();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].slug(), registered.slug);

        let pairs = registry.triggers_for_entity(&kind).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1.name, "order_saved");
    }

    #[test]
    fn test_checks_for_entity_preserves_registration_order() {
        let registry = CheckRegistry::new();
        let kind = EntityKind::derive("shop", "Order");

        for name in ["Processing", "Audit"] {
            let check = TestCheck::plain("shop", name)
                .with_triggers(vec![TriggerSpec::new("order_saved", "shop.Order")], true);
            registry.register(Arc::new(check)).unwrap();
        }

        let checks = registry.checks_for_entity(&kind).unwrap().unwrap();
        let slugs: Vec<String> = checks.iter().map(|c| c.slug().to_string()).collect();
        assert_eq!(slugs, vec!["shop.Processing", "shop.Audit"]);
    }

    #[test]
    fn test_degenerate_trigger_declarations_are_skipped() {
        let registry = CheckRegistry::new();
        let check = TestCheck::plain("shop", "OrderProcessing").with_triggers(
            vec![
                TriggerSpec::new("order_saved", "shop.Order"),
                TriggerSpec::new("order_saved", "shop.Order"),
                TriggerSpec::new("", "shop.Order"),
            ],
            true,
        );

        let registered = registry.register(Arc::new(check)).unwrap();
        let kind = EntityKind::derive("shop", "Order");
        assert_eq!(registered.trigger_kinds.len(), 1);
        assert_eq!(registry.triggers_for_entity(&kind).unwrap().len(), 1);
    }

    #[test]
    fn test_check_listening_to_multiple_kinds() {
        let registry = CheckRegistry::new();
        let check = TestCheck::plain("shop", "Fulfilment").with_triggers(
            vec![
                TriggerSpec::new("order_saved", "shop.Order"),
                TriggerSpec::new("shipment_saved", "shop.Shipment"),
            ],
            true,
        );

        let registered = registry.register(Arc::new(check)).unwrap();
        assert_eq!(registered.trigger_kinds.len(), 2);
        for kind in ["shop.Order", "shop.Shipment"] {
            let kind = EntityKind::from(kind);
            assert_eq!(registry.triggers_for_entity(&kind).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_slugs_are_sorted() {
        let registry = CheckRegistry::new();
        registry
            .register(Arc::new(TestCheck::plain("checks", "Zed")))
            .unwrap();
        registry
            .register(Arc::new(TestCheck::plain("checks", "Alpha")))
            .unwrap();

        let slugs: Vec<String> = registry
            .slugs()
            .unwrap()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(slugs, vec!["checks.Alpha", "checks.Zed"]);
        assert_eq!(registry.all_checks().unwrap().len(), 2);
    }
}
