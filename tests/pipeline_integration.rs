//! Building and running pipelines end to end

mod common;

use common::builders::{double_of, echo_int, register_recorder};
use common::{box_context, IntBox, StringBox, INT_BOX, STRING_BOX};
use std::io::Write;
use viennamesh::algorithm::InstanceState;
use viennamesh::pipeline::{AlgorithmDecl, ParameterDecl, ParameterType};
use viennamesh::{ErrorCode, PipelineBuilder, PipelineDescription, ViennaMeshError, DEFAULT_PORT};

#[test]
fn test_conversion_scenario() {
    let (ctx, live) = box_context();
    let source = ctx.make_value(INT_BOX, IntBox(42)).unwrap();
    let converted = ctx.convert(&source, STRING_BOX).unwrap();
    assert_eq!(
        converted.get::<StringBox>(0).unwrap(),
        &StringBox("42".to_string())
    );
    drop((source, converted));
    assert_eq!(live.get(), 0);
}

#[test]
fn test_two_instance_pipeline() {
    let (ctx, _live) = box_context();
    let desc = PipelineDescription::new()
        .algorithm(echo_int("A", 7))
        .algorithm(double_of("B", "A"));

    let pipeline = PipelineBuilder::new(&ctx).build(&desc).unwrap();
    pipeline.run().unwrap();

    let b = pipeline.get("B").unwrap();
    assert_eq!(b.state(), InstanceState::Ran);
    let out = b.get_output(DEFAULT_PORT).unwrap();
    assert_eq!(out.value::<i64>(0).unwrap(), 14);
    assert_eq!(pipeline.stats().links, 1);
}

#[test]
fn test_default_source_fallback() {
    let (ctx, _live) = box_context();
    let desc = PipelineDescription::new()
        .algorithm(echo_int("A", 21))
        .algorithm(AlgorithmDecl::new("double", "B").default_source("A"));

    let pipeline = PipelineBuilder::new(&ctx).build(&desc).unwrap();
    pipeline.run().unwrap();
    let out = pipeline.get("B").unwrap().get_output(DEFAULT_PORT).unwrap();
    assert_eq!(out.value::<i64>(0).unwrap(), 42);
}

#[test]
fn test_explicit_parameter_beats_default_source() {
    let (ctx, _live) = box_context();
    let desc = PipelineDescription::new()
        .algorithm(echo_int("A", 1))
        .algorithm(
            AlgorithmDecl::new("double", "B")
                .default_source("A")
                .parameter(ParameterDecl::new("value", ParameterType::Int, "5")),
        );

    let pipeline = PipelineBuilder::new(&ctx).build(&desc).unwrap();
    pipeline.run().unwrap();
    let out = pipeline.get("B").unwrap().get_output(DEFAULT_PORT).unwrap();
    assert_eq!(out.value::<i64>(0).unwrap(), 10);
}

#[test]
fn test_string_literal_converted_on_read() {
    let (ctx, _live) = box_context();
    let desc = PipelineDescription::new().algorithm(
        AlgorithmDecl::new("double", "B")
            .parameter(ParameterDecl::new("value", ParameterType::String, "8")),
    );
    let pipeline = PipelineBuilder::new(&ctx).build(&desc).unwrap();
    pipeline.run().unwrap();
    let out = pipeline.get("B").unwrap().get_output(DEFAULT_PORT).unwrap();
    assert_eq!(out.value::<i64>(0).unwrap(), 16);
}

#[test]
fn test_runs_in_declaration_order() {
    let (ctx, _live) = box_context();
    let log = register_recorder(&ctx);
    let desc = PipelineDescription::new()
        .algorithm(AlgorithmDecl::new("record", "third_declared_first"))
        .algorithm(AlgorithmDecl::new("record", "second"))
        .algorithm(AlgorithmDecl::new("record", "last"));

    PipelineBuilder::new(&ctx)
        .build(&desc)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(
        *log.lock(),
        vec!["third_declared_first", "second", "last"]
    );
}

#[test]
fn test_run_stops_at_first_failure() {
    let (ctx, _live) = box_context();
    let log = register_recorder(&ctx);
    let desc = PipelineDescription::new()
        .algorithm(AlgorithmDecl::new("record", "before"))
        .algorithm(AlgorithmDecl::new("fail", "broken"))
        .algorithm(AlgorithmDecl::new("record", "after"));

    let pipeline = PipelineBuilder::new(&ctx).build(&desc).unwrap();
    let err = pipeline.run().unwrap_err();

    assert_eq!(err.code(), ErrorCode::AlgorithmRunFailure);
    assert!(err.to_string().contains("broken"), "{}", err);
    assert_eq!(*log.lock(), vec!["before"]);
    assert_eq!(pipeline.get("broken").unwrap().state(), InstanceState::Failed);
    assert_eq!(pipeline.get("after").unwrap().run_count(), 0);
    assert_eq!(
        ctx.last_error().unwrap().code,
        ErrorCode::AlgorithmRunFailure
    );
}

#[test]
fn test_missing_required_input_fails_run() {
    let (ctx, _live) = box_context();
    let desc = PipelineDescription::new().algorithm(AlgorithmDecl::new("echo", "A"));
    let pipeline = PipelineBuilder::new(&ctx).build(&desc).unwrap();
    let err = pipeline.run().unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlgorithmRunFailure);
    match err {
        ViennaMeshError::AlgorithmRun { source, .. } => {
            assert_eq!(source.code(), ErrorCode::RequiredInputMissing)
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_unresolved_link_fails_build() {
    let (ctx, _live) = box_context();
    let desc = PipelineDescription::new()
        .algorithm(echo_int("A", 1))
        .algorithm(double_of("B", "Z"));
    let err = PipelineBuilder::new(&ctx).build(&desc).unwrap_err();
    assert_eq!(err.code(), ErrorCode::UnresolvedLinkReference);
}

#[test]
fn test_dropping_pipeline_releases_everything() {
    let (ctx, live) = box_context();
    let desc = PipelineDescription::new()
        .algorithm(AlgorithmDecl::new("echo", "A").parameter(ParameterDecl::new(
            "value",
            ParameterType::String,
            "7",
        )))
        .algorithm(
            AlgorithmDecl::new("echo", "B")
                .parameter(ParameterDecl::link("value", "A", DEFAULT_PORT)),
        );
    let refs_before = ctx.ref_count();

    let pipeline = PipelineBuilder::new(&ctx).build(&desc).unwrap();
    pipeline.run().unwrap();
    let a = pipeline.get("A").unwrap().downgrade();
    drop(pipeline);

    assert!(a.upgrade().is_none());
    assert_eq!(ctx.ref_count(), refs_before);
    assert_eq!(live.get(), 0);
}

#[test]
fn test_xml_file_pipeline() {
    let (ctx, _live) = box_context();
    let mut file = tempfile::Builder::new()
        .suffix(".xml")
        .tempfile()
        .unwrap();
    write!(
        file,
        r#"<?xml version="1.0"?>
        <pipeline>
          <algorithm id="echo" name="A">
            <parameter name="value" type="int">7</parameter>
          </algorithm>
          <algorithm id="double" name="B">
            <default_source>A</default_source>
            <parameter name="value" type="dynamic">A/default</parameter>
          </algorithm>
        </pipeline>"#
    )
    .unwrap();

    let desc = PipelineDescription::load(file.path()).unwrap();
    let pipeline = PipelineBuilder::new(&ctx)
        .base_path(file.path().parent().unwrap())
        .build(&desc)
        .unwrap();
    pipeline.run().unwrap();

    let b = pipeline.get("B").unwrap();
    assert_eq!(
        b.get_output(DEFAULT_PORT).unwrap().value::<i64>(0).unwrap(),
        14
    );
    assert_eq!(
        b.base_path().as_deref(),
        file.path().parent()
    );
}

#[test]
fn test_json_round_trip_builds_same_pipeline() {
    let (ctx, _live) = box_context();
    let desc = PipelineDescription::new()
        .algorithm(echo_int("A", 3))
        .algorithm(double_of("B", "A"));
    let json = desc.to_json().unwrap();
    let parsed = PipelineDescription::from_json_str(&json).unwrap();
    assert_eq!(parsed, desc);

    let pipeline = PipelineBuilder::new(&ctx).build(&parsed).unwrap();
    pipeline.run().unwrap();
    assert_eq!(
        pipeline
            .get("B")
            .unwrap()
            .get_output(DEFAULT_PORT)
            .unwrap()
            .value::<i64>(0)
            .unwrap(),
        6
    );
}
