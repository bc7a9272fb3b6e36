//! Building a `Pipeline` from a `PipelineDescription`.
//!
//! Every reference is resolved while building, against instances declared
//! earlier in the description. The build is all-or-nothing: on any error
//! the partially built pipeline and its instances are dropped.

use crate::algorithm::{AlgorithmHandle, PortDirection};
use crate::context::Context;
use crate::data::builtin::{self, Point, XmlFragment};
use crate::data::DataHandle;
use crate::error::{Result, ResultExt};
use crate::pipeline::description::{AlgorithmDecl, ParameterDecl, ParameterType, PipelineDescription};
use crate::pipeline::error::PipelineError;
use crate::pipeline::executor::{LinkEdge, Pipeline};
use crate::pipeline::id::InstanceId;
use std::path::PathBuf;

pub struct PipelineBuilder<'a> {
    context: &'a Context,
    base_path: Option<PathBuf>,
}

impl<'a> PipelineBuilder<'a> {
    pub fn new(context: &'a Context) -> Self {
        Self {
            context,
            base_path: None,
        }
    }

    /// Directory relative file parameters are resolved against. Usually the
    /// directory of the description file.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    pub fn build(&self, description: &PipelineDescription) -> Result<Pipeline> {
        let result = self.build_inner(description);
        self.context.record(result)
    }

    fn build_inner(&self, description: &PipelineDescription) -> Result<Pipeline> {
        let mut pipeline = Pipeline::new(self.context);
        for decl in &description.algorithms {
            self.declare(&mut pipeline, decl)?;
        }
        let stats = pipeline.stats();
        tracing::info!(
            "Built pipeline: {} instance(s), {} link(s), {} literal(s), {} default source(s)",
            stats.instances,
            stats.links,
            stats.literals,
            stats.default_sources
        );
        Ok(pipeline)
    }

    fn declare(&self, pipeline: &mut Pipeline, decl: &AlgorithmDecl) -> Result<()> {
        if pipeline.id_of(&decl.name).is_some() {
            return Err(PipelineError::DuplicateInstance(decl.name.clone()).into());
        }

        let instance = self
            .context
            .make_named_algorithm(&decl.id, &decl.name)
            .with_context(|| format!("Declaring instance '{}'", decl.name))?;
        if let Some(base) = &self.base_path {
            instance.set_base_path(base);
        }

        let default_source = match &decl.default_source {
            Some(target) => {
                let id = pipeline.id_of(target).ok_or_else(|| {
                    PipelineError::UnresolvedDefaultSource {
                        instance: decl.name.clone(),
                        target: target.clone(),
                    }
                })?;
                if let Some(source) = pipeline.node(id) {
                    instance.set_default_source(&source.instance);
                }
                Some(id)
            }
            None => None,
        };

        let id = InstanceId(pipeline.len() as u32);
        for parameter in &decl.parameters {
            self.bind(pipeline, id, &instance, decl, parameter)?;
        }
        pipeline.add_node(&decl.name, &decl.id, instance, default_source);
        Ok(())
    }

    fn bind(
        &self,
        pipeline: &mut Pipeline,
        id: InstanceId,
        instance: &AlgorithmHandle,
        decl: &AlgorithmDecl,
        parameter: &ParameterDecl,
    ) -> Result<()> {
        warn_if_undeclared(instance, parameter);

        if parameter.kind != ParameterType::Dynamic {
            let value = self.literal(decl, parameter)?;
            instance.set_input(&parameter.name, value);
            pipeline.count_literal();
            return Ok(());
        }

        let malformed = || PipelineError::MalformedLink {
            instance: decl.name.clone(),
            parameter: parameter.name.clone(),
            value: parameter.value.clone(),
        };
        let (target, output) = parameter
            .value
            .trim()
            .split_once('/')
            .ok_or_else(malformed)?;
        if target.is_empty() || output.is_empty() {
            return Err(malformed().into());
        }

        let from = pipeline
            .id_of(target)
            .ok_or_else(|| PipelineError::UnresolvedLink {
                instance: decl.name.clone(),
                parameter: parameter.name.clone(),
                target: target.to_string(),
            })?;
        if let Some(source) = pipeline.node(from) {
            instance.link_input(&parameter.name, &source.instance, output);
        }
        pipeline.add_link(LinkEdge {
            from,
            output: output.to_string(),
            to: id,
            input: parameter.name.clone(),
        });
        Ok(())
    }

    /// Parse a literal parameter into a single-slot handle of its built-in
    /// type.
    fn literal(&self, decl: &AlgorithmDecl, parameter: &ParameterDecl) -> Result<DataHandle> {
        let invalid = || PipelineError::InvalidLiteral {
            instance: decl.name.clone(),
            parameter: parameter.name.clone(),
            kind: parameter.kind,
            value: parameter.value.clone(),
        };
        // Dynamic parameters are links, never literals
        let type_name = parameter.kind.data_type().ok_or_else(invalid)?;
        let text = parameter.value.as_str();
        let ctx = self.context;
        match parameter.kind {
            ParameterType::String => ctx.make_value(type_name, text.to_string()),
            ParameterType::Bool => {
                let value = builtin::parse_bool(text).ok_or_else(invalid)?;
                ctx.make_value(type_name, value)
            }
            ParameterType::Int => {
                let value = builtin::parse_int(text).ok_or_else(invalid)?;
                ctx.make_value(type_name, value)
            }
            ParameterType::Double => {
                let value = builtin::parse_double(text).ok_or_else(invalid)?;
                ctx.make_value(type_name, value)
            }
            ParameterType::Point => {
                let value = Point::parse(text).ok_or_else(invalid)?;
                ctx.make_value(type_name, value)
            }
            ParameterType::Xml => ctx.make_value(type_name, XmlFragment(text.to_string())),
            ParameterType::Dynamic => Err(invalid().into()),
        }
    }
}

fn warn_if_undeclared(instance: &AlgorithmHandle, parameter: &ParameterDecl) {
    let ports = instance.ports();
    if ports.is_empty() {
        return;
    }
    let declared = ports
        .iter()
        .any(|p| p.direction == PortDirection::Input && p.name == parameter.name);
    if !declared {
        tracing::warn!(
            "Parameter '{}' of '{}' does not match any declared input of '{}'",
            parameter.name,
            instance.name(),
            instance.algorithm_name()
        );
    }
}
