// SPDX-License-Identifier: PMPL-1.0-or-later
//! Scope combinator.
//!
//! [`ScopeCompiler`] owns the catalog, resolved paths and dispatch table,
//! all built once and never mutated. `compile` is a pure function of the
//! filter set and options, so one compiler can be shared behind an `Arc`
//! across any number of concurrent requests.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::builders::{BuildContext, Contribution, FilterArgs};
use crate::config::{CompilerConfig, RejectionPolicy};
use crate::dispatch::DispatchTable;
use crate::error::ScopeError;
use crate::exists::Association;
use crate::filters::{FilterKey, FilterSet};
use crate::relation::{Catalog, RelationPaths};
use crate::scope::{Scope, ScopeResult};
use crate::sql::Predicate;
use crate::Domain;

/// Request-scoped inputs resolved by the caller before compiling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileOptions {
    /// The authenticated user, for filters over user-owned data such as
    /// groups.
    pub user_id: Option<i64>,
}

impl CompileOptions {
    pub fn for_user(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }
}

/// Compiles filter sets into per-domain scopes.
#[derive(Debug)]
pub struct ScopeCompiler {
    config: CompilerConfig,
    catalog: Catalog,
    paths: RelationPaths,
    table: DispatchTable,
}

impl ScopeCompiler {
    /// Build with the standard catalog and dispatch table.
    pub fn new(config: CompilerConfig) -> Result<Self, ScopeError> {
        Self::from_parts(config, Catalog::standard()?, DispatchTable::standard()?)
    }

    /// Build from explicitly supplied parts. Every path the builders read is
    /// resolved against `catalog` here, and every mandatory filter must be
    /// registered in `table`.
    pub fn from_parts(
        config: CompilerConfig,
        catalog: Catalog,
        table: DispatchTable,
    ) -> Result<Self, ScopeError> {
        config.validate()?;
        let paths = RelationPaths::resolve(&catalog)?;
        for key in &config.mandatory_filters {
            let registered = FilterKey::parse(key)
                .and_then(|k| DispatchTable::parse_key(&k.topic, &k.condition))
                .map(|(topic, condition)| !table.domains_for(topic, condition).is_empty())
                .unwrap_or(false);
            if !registered {
                return Err(ScopeError::InvalidConfig(format!(
                    "mandatory filter {} is not registered for any domain",
                    key
                )));
            }
        }
        debug!(
            entries = table.len(),
            mandatory = config.mandatory_filters.len(),
            "Scope compiler ready"
        );
        Ok(Self {
            config,
            catalog,
            paths,
            table,
        })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn table(&self) -> &DispatchTable {
        &self.table
    }

    /// Compile `filters` for every domain.
    ///
    /// Unrecognized filters are dropped. The only error is a rejected value
    /// for a mandatory filter.
    pub fn compile(
        &self,
        filters: &FilterSet,
        options: &CompileOptions,
    ) -> Result<ScopeResult, ScopeError> {
        for (key, _) in filters.iter() {
            let known = DispatchTable::parse_key(&key.topic, &key.condition)
                .map(|(topic, condition)| !self.table.domains_for(topic, condition).is_empty())
                .unwrap_or(false);
            if !known {
                debug!(key = %key, "Dropping unrecognized filter");
            }
        }

        let mut result = ScopeResult::identity();
        for domain in Domain::ALL {
            result.insert(domain, self.compile_domain(domain, filters, options)?);
        }
        debug!(
            filters = filters.len(),
            constrained = result.constrained_domains().len(),
            "Compiled filter scopes"
        );
        Ok(result)
    }

    /// Compile `filters` for a single domain; filters the domain does not
    /// register contribute nothing.
    pub fn compile_domain(
        &self,
        domain: Domain,
        filters: &FilterSet,
        options: &CompileOptions,
    ) -> Result<Scope, ScopeError> {
        let ctx = BuildContext {
            config: &self.config,
            paths: &self.paths,
            options,
        };
        let mut scope = Scope::identity();
        for (key, value) in filters.iter() {
            let Some((topic, condition)) = DispatchTable::parse_key(&key.topic, &key.condition)
            else {
                continue;
            };
            let Some(build) = self.table.resolve(domain, topic, condition) else {
                continue;
            };
            match build(&ctx, &FilterArgs { condition, value }) {
                Contribution::Constrain(association) => scope.constrain(association),
                Contribution::Reject(rejection) => {
                    if self.config.is_mandatory(key) {
                        warn!(
                            domain = %domain,
                            key = %key,
                            reason = %rejection.rejected,
                            "Mandatory filter rejected"
                        );
                        return Err(ScopeError::MandatoryFilterRejected {
                            key: key.to_string(),
                        });
                    }
                    debug!(
                        domain = %domain,
                        key = %key,
                        reason = %rejection.rejected,
                        policy = ?rejection.policy,
                        "Filter value rejected"
                    );
                    if rejection.policy == RejectionPolicy::MatchNothing {
                        scope.constrain(Association::new(Predicate::Never));
                    }
                }
            }
        }
        Ok(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Condition, Topic, TopicRule, MEMBERSHIP};
    use crate::filters::FilterTriple;

    fn compiler() -> ScopeCompiler {
        ScopeCompiler::new(CompilerConfig::default()).unwrap()
    }

    #[test]
    fn test_compiler_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ScopeCompiler>();
    }

    #[test]
    fn test_empty_filters_compile_to_identity() {
        let result = compiler()
            .compile(&FilterSet::new(), &CompileOptions::default())
            .unwrap();
        assert!(result.constrained_domains().is_empty());
    }

    #[test]
    fn test_region_constrains_every_domain() {
        let filters = FilterSet::from_triples(vec![FilterTriple::new("region", "in", vec!["1"])]);
        let result = compiler()
            .compile(&filters, &CompileOptions::default())
            .unwrap();
        assert_eq!(result.constrained_domains(), Domain::ALL.to_vec());
    }

    #[test]
    fn test_goal_name_only_touches_registering_domains() {
        let filters = FilterSet::from_triples(vec![FilterTriple::new("goalName", "ctn", "pig")]);
        let result = compiler()
            .compile(&filters, &CompileOptions::default())
            .unwrap();
        assert_eq!(
            result.constrained_domains(),
            vec![Domain::Grant, Domain::Goal]
        );
    }

    #[test]
    fn test_unknown_filter_is_dropped() {
        let compiler = compiler();
        let base = FilterSet::from_triples(vec![FilterTriple::new("region", "in", vec!["1"])]);
        let mut noisy = base.clone();
        noisy.insert(FilterTriple::new("favoriteColor", "in", "blue"));
        noisy.insert(FilterTriple::new("region", "between", "1"));
        let options = CompileOptions::default();
        assert_eq!(
            compiler.compile(&base, &options).unwrap(),
            compiler.compile(&noisy, &options).unwrap()
        );
    }

    #[test]
    fn test_match_nothing_policy_yields_never() {
        let filters = FilterSet::from_triples(vec![FilterTriple::new("topic", "in", vec!["Potato"])]);
        let result = compiler()
            .compile(&filters, &CompileOptions::default())
            .unwrap();
        assert_eq!(
            result.get(Domain::ActivityReport).unwrap().predicate,
            Predicate::Never
        );
        assert_eq!(result.get(Domain::Goal).unwrap().predicate, Predicate::Never);
    }

    #[test]
    fn test_ignore_policy_yields_identity() {
        let filters =
            FilterSet::from_triples(vec![FilterTriple::new("role", "in", vec!["DROP * FROM *"])]);
        let result = compiler()
            .compile(&filters, &CompileOptions::default())
            .unwrap();
        assert!(result.get(Domain::ActivityReport).unwrap().is_identity());
    }

    #[test]
    fn test_mandatory_rejection_is_an_error() {
        let config = CompilerConfig {
            mandatory_filters: vec!["region.in".to_string()],
            ..Default::default()
        };
        let compiler = ScopeCompiler::new(config).unwrap();
        let filters = FilterSet::from_triples(vec![FilterTriple::new("region", "in", vec!["x"])]);
        let err = compiler
            .compile(&filters, &CompileOptions::default())
            .unwrap_err();
        assert!(matches!(err, ScopeError::MandatoryFilterRejected { ref key } if key == "region.in"));
    }

    #[test]
    fn test_unregistered_mandatory_filter_fails_construction() {
        let config = CompilerConfig {
            mandatory_filters: vec!["favoriteColor.in".to_string()],
            ..Default::default()
        };
        assert!(matches!(
            ScopeCompiler::new(config),
            Err(ScopeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_from_parts_with_custom_table() {
        fn region_only(ctx: &BuildContext<'_>, args: &FilterArgs<'_>) -> Contribution {
            crate::builders::integer_in(args, &ctx.paths.grant, "regionId").into()
        }
        let table = DispatchTable::from_rules([(
            Domain::Grant,
            vec![TopicRule::new(Topic::Region, MEMBERSHIP, region_only)],
        )])
        .unwrap();
        let compiler =
            ScopeCompiler::from_parts(CompilerConfig::default(), Catalog::standard().unwrap(), table)
                .unwrap();
        let filters = FilterSet::from_triples(vec![
            FilterTriple::new("region", "in", vec!["1"]),
            FilterTriple::new("goalName", "ctn", "pig"),
        ]);
        let result = compiler
            .compile(&filters, &CompileOptions::default())
            .unwrap();
        assert_eq!(result.constrained_domains(), vec![Domain::Grant]);
        assert!(compiler
            .table()
            .resolve(Domain::Grant, Topic::Region, Condition::Nin)
            .is_some());
        assert!(!compiler.config().is_mandatory(&FilterKey::new("region", "in")));
    }

    #[test]
    fn test_compile_domain_matches_compile() {
        let compiler = compiler();
        let filters = FilterSet::from_triples(vec![
            FilterTriple::new("region", "in", vec!["1", "4"]),
            FilterTriple::new("goalName", "nctn", "pig"),
        ]);
        let options = CompileOptions::default();
        let all = compiler.compile(&filters, &options).unwrap();
        let goal = compiler
            .compile_domain(Domain::Goal, &filters, &options)
            .unwrap();
        assert_eq!(all.get(Domain::Goal), Some(&goal));
    }
}
