//! Example: Import a USDA file, print its primvars, and optionally re-export it.
//!
//! Run with: cargo run --example inspect_usda -- scene.usda [out.usda] [options]

use std::env;

use anyhow::Context;
use meshpack_core::usd::LightFilter;
use meshpack_core::MeshTranslator;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        println!("Usage: inspect_usda <input.usda> [output.usda] [options]");
        println!("\nExamples:");
        println!("  cargo run --example inspect_usda -- scene.usda");
        println!("  cargo run --example inspect_usda -- scene.usda out.usda \"Compaction_Level=1;\"");
        return Ok(());
    }

    let translator = match args.get(3) {
        Some(options) => MeshTranslator::from_option_string(options)?,
        None => MeshTranslator::default(),
    };

    let path = &args[1];
    let layer = translator
        .import_usda(path)
        .with_context(|| format!("Failed to import {}", path))?;

    println!("\n--- Meshes ---");
    for mesh in &layer.meshes {
        println!(
            "  {} - {} points, {} faces, {} triangles, normals: {}",
            mesh.name,
            mesh.points.len(),
            mesh.topology.face_count(),
            mesh.topology.triangulate().len() / 3,
            mesh.has_normals()
        );

        // Show what each set compacts to on export
        let prim = translator.export_mesh(mesh)?;
        for primvar in &prim.primvars {
            println!(
                "       {} {} ({}, {} values{})",
                primvar.type_name(),
                primvar.name(),
                primvar.interpolation(),
                primvar.value_count(),
                if primvar.indices().is_some() { ", indexed" } else { "" }
            );
        }
    }

    println!(
        "\n--- Light Filters ({}, typed: {}, base {}) ---",
        LightFilter::TYPE_NAME,
        LightFilter::is_typed_schema(),
        LightFilter::BASE_TYPE_NAME
    );
    for filter in &layer.light_filters {
        let collection = filter.filter_link_collection_api();
        println!(
            "  {} - {} = {}, includeRoot: {}",
            filter.path,
            collection.expansion_rule_attr_name(),
            collection.expansion_rule,
            collection.include_root
        );
        for target in &collection.includes {
            println!("       includes {}", target);
        }
        for target in &collection.excludes {
            println!("       excludes {}", target);
        }
    }

    if let Some(out) = args.get(2) {
        translator.export_usda(out, &layer.meshes, &layer.light_filters)?;
        println!("\nWrote {}", out);
    }

    Ok(())
}
