use std::{collections::HashSet, fs, path::Path};

use validator::{Validate, ValidationErrors, ValidationErrorsKind};

use super::{
    config::{FrontDoorConf, RouteConf},
    engines::EngineConf,
};
use crate::prelude::{Result, RouteManagerError};

trait Named {
    fn name(&self) -> &str;
}

impl Named for RouteConf {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for EngineConf {
    fn name(&self) -> &str {
        &self.name
    }
}

fn first_by_name<T: Named>(kind: &str, items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| {
            let fresh = seen.insert(item.name().to_string());
            if !fresh {
                tracing::warn!("dropping duplicate {} {}", kind, item.name());
            }
            fresh
        })
        .collect()
}

impl FrontDoorConf {
    pub fn load(path: &Path) -> Result<Option<FrontDoorConf>> {
        if !path.is_file() {
            return Ok(None);
        }
        let yaml = fs::read_to_string(path)?;
        Ok(Some(Self::from_yaml(&yaml)?))
    }

    /// Parses, de-duplicates and validates a run document. Every validation
    /// problem is reported at once, before anything touches Azure.
    pub fn from_yaml(yaml: &str) -> Result<FrontDoorConf> {
        let conf: FrontDoorConf = serde_yaml::from_str(yaml)?;
        let conf = conf.dedupe();
        conf.validate()
            .map_err(|errors| RouteManagerError::ConfigIssues(issues(&errors)))?;
        tracing::debug!(
            "loaded {} routes, {} engines, {} associations",
            conf.routing_rules.len(),
            conf.engine_rules.len(),
            conf.engine_associations.len()
        );
        Ok(conf)
    }

    fn dedupe(mut self) -> Self {
        self.routing_rules = first_by_name("route", self.routing_rules);
        self.engine_rules = first_by_name("engine", self.engine_rules);
        let mut seen = Vec::new();
        self.engine_associations.retain(|a| {
            let fresh = !seen.contains(a);
            if fresh {
                seen.push(a.clone());
            }
            fresh
        });
        self
    }
}

fn issues(errors: &ValidationErrors) -> Vec<String> {
    let mut out = Vec::new();
    flatten("", errors, &mut out);
    out.sort();
    out
}

fn flatten(path: &str, errors: &ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        let here = if path.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", path, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => out.extend(list.iter().map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{}: {}", here, e.code),
            })),
            ValidationErrorsKind::Struct(inner) => flatten(&here, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten(&format!("{}[{}]", here, index), inner, out);
                }
            }
        }
    }
}
