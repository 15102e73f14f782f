//! nif-cli - Tool for inspecting and re-writing NIF files.

use std::env;
use std::path::Path;
use std::time::Instant;

use nif::prelude::*;
use rayon::prelude::*;
use serde_json::json;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() {
    let args: Vec<String> = env::args().collect();

    // Parse global flags
    let mut level = "info";
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "error",
            _ => filtered_args.push(arg),
        }
    }
    let json_mode = filtered_args.iter().any(|&s| s == "--json" || s == "-j");
    init_logging(if json_mode { "error" } else { level });

    if filtered_args.is_empty() {
        print_help();
        return;
    }

    let result = match filtered_args[0] {
        // Info command - header and package summary, many files in parallel
        "info" | "i" => {
            if filtered_args.len() < 2 {
                usage("nif-cli info <file.nif>...");
            }
            cmd_info(&filtered_args[1..])
        }

        // Tree command - node forest
        "tree" | "t" => {
            if filtered_args.len() < 2 {
                usage("nif-cli tree <file.nif>");
            }
            cmd_tree(filtered_args[1])
        }

        // Dump command - block table or package as JSON
        "dump" | "d" => {
            if filtered_args.len() < 2 {
                usage("nif-cli dump <file.nif> [--json]");
            }
            cmd_dump(filtered_args[1], json_mode)
        }

        // Materials command
        "materials" | "m" => {
            if filtered_args.len() < 2 {
                usage("nif-cli materials <file.nif>");
            }
            cmd_materials(filtered_args[1])
        }

        // Roundtrip command - parse, link, export, re-parse
        "roundtrip" | "r" => {
            if filtered_args.len() < 3 {
                usage("nif-cli roundtrip <input.nif> <output.nif> [--big-endian]");
            }
            let big = filtered_args.iter().any(|&s| s == "--big-endian" || s == "-b");
            cmd_roundtrip(filtered_args[1], filtered_args[2], big)
        }

        "version" | "-V" | "--version" => {
            print_version();
            Ok(())
        }

        // Help
        "help" | "h" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        // Default: if file exists, show info; otherwise error
        other => {
            if Path::new(other).exists() {
                cmd_info(&filtered_args[..1])
            } else {
                eprintln!("Unknown command: {}", other);
                eprintln!();
                print_help();
                std::process::exit(1);
            }
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn usage(text: &str) -> ! {
    eprintln!("Error: missing arguments");
    eprintln!("Usage: {}", text);
    std::process::exit(1);
}

fn print_version() {
    println!(
        "nif-cli {} (built {} {})",
        env!("CARGO_PKG_VERSION"),
        env!("NIF_BUILD_DATE"),
        env!("NIF_BUILD_TIME")
    );
}

fn print_help() {
    println!("nif-cli - NIF file toolkit");
    println!();
    println!("USAGE:");
    println!("    nif-cli [OPTIONS] <COMMAND> [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    i, info      <file>...            Show header and package summary");
    println!("    t, tree      <file>               Show node hierarchy with world positions");
    println!("    d, dump      <file> [--json]      List blocks, or the package as JSON");
    println!("    m, materials <file>               Show materials and texture paths");
    println!("    r, roundtrip <in> <out> [-b]      Re-write through the package model");
    println!("    version                           Show version and build date");
    println!("    h, help                           Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose      Show debug output");
    println!("    -vv, --trace       Show trace output (very verbose)");
    println!("    -q, --quiet        Only show errors");
    println!("    -b, --big-endian   Write big-endian output (roundtrip)");
    println!();
    println!("RUST_LOG overrides the log level, e.g. RUST_LOG=nif=trace.");
}

/// Per-file line for `info`.
fn summarize(path: &str, cache: &FormatCache) -> Result<String> {
    let start = Instant::now();
    let doc = Document::open(path)?;
    let package = link(&doc, cache)?;
    let unknown = doc.blocks.iter().filter(|b| b.payload.is_unknown()).count();
    Ok(format!(
        "{}\n  Banner:    {}\n  Version:   {:#010x} ({:?} endian, user {})\n  Blocks:    {} ({} types, {} opaque)\n  Strings:   {}\n  Nodes:     {} ({} meshes)\n  Materials: {}\n  Parsed in  {:.2?}",
        path,
        doc.banner,
        doc.version,
        doc.endian,
        doc.user_version,
        doc.len(),
        doc.block_types.len(),
        unknown,
        doc.strings.len(),
        package.nodes.len(),
        package.mesh_count(),
        package.materials.len(),
        start.elapsed()
    ))
}

fn cmd_info(paths: &[&str]) -> Result<()> {
    let cache = FormatCache::new();
    info!(files = paths.len(), "inspecting");
    let results: Vec<_> = paths.par_iter().map(|p| (*p, summarize(p, &cache))).collect();

    let mut failed = 0;
    for (path, result) in results {
        match result {
            Ok(text) => println!("{}\n", text),
            Err(e) => {
                failed += 1;
                eprintln!("Failed to read {}: {}", path, e);
            }
        }
    }
    let (hits, misses) = cache.stats();
    debug!(formats = cache.len(), hits, misses, "format cache");
    if failed > 0 {
        return Err(Error::other(format!("{} of {} files failed", failed, paths.len())));
    }
    Ok(())
}

fn cmd_tree(path: &str) -> Result<()> {
    let package = load(path)?;
    println!("File: {}", path);
    println!();
    for root in package.roots() {
        print_node(&package, root);
    }
    Ok(())
}

fn print_node(package: &Package, index: usize) {
    let node = &package.nodes[index];
    let indent = "  ".repeat(package.depth(index));
    let world = package.world_matrix(index).unwrap_or(Mat4::IDENTITY);
    let pos = world.transform_point3(Vec3::ZERO);
    let kind = match &node.mesh {
        Some(mesh) => format!("Mesh, {} verts, {} indices", mesh.vertex_count(), mesh.indices().len()),
        None => "Node".to_string(),
    };
    println!(
        "{}{} [{}] @ ({:.3}, {:.3}, {:.3})",
        indent, node.name, kind, pos.x, pos.y, pos.z
    );
    for child in package.children(index) {
        print_node(package, child);
    }
}

fn cmd_dump(path: &str, json_mode: bool) -> Result<()> {
    let doc = Document::open(path)?;
    if !json_mode {
        println!("File: {} ({} blocks)", path, doc.len());
        for (i, block) in doc.blocks.iter().enumerate() {
            println!(
                "  [{:4}] {:<32} {:>8} bytes  {:<12} {}",
                i,
                block.base_name(),
                block.size,
                block.payload.kind(),
                block.name.as_deref().unwrap_or("")
            );
        }
        return Ok(());
    }

    let package = link(&doc, &FormatCache::new())?;
    let nodes: Vec<_> = package
        .nodes
        .iter()
        .map(|n| {
            let mesh = n.mesh.as_ref().map(|m| {
                let attributes: Vec<_> = m
                    .format()
                    .attributes()
                    .iter()
                    .map(|a| {
                        json!({
                            "name": a.name,
                            "type": a.data_type.name(),
                            "count": a.element_count,
                            "binding": a.binding,
                            "offset": a.offset,
                        })
                    })
                    .collect();
                json!({
                    "vertices": m.vertex_count(),
                    "indices": m.indices().len(),
                    "attributes": attributes,
                })
            });
            json!({
                "name": n.name,
                "parent": n.attached_to,
                "material": n.material,
                "translation": n.transform.translation.to_array(),
                "scale": n.transform.scale,
                "mesh": mesh,
            })
        })
        .collect();
    let materials: Vec<_> = package.materials.iter().map(material_json).collect();
    let out = json!({
        "file": path,
        "banner": doc.banner,
        "version": doc.version,
        "endian": format!("{:?}", doc.endian),
        "nodes": nodes,
        "materials": materials,
    });
    let text = serde_json::to_string_pretty(&out).map_err(|e| Error::other(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn material_json(m: &Material) -> serde_json::Value {
    json!({
        "name": m.name,
        "shader": m.shader_name,
        "diffuse": m.diffuse,
        "normal": m.normal,
        "specular": m.specular,
        "overrideColor": m.override_color,
        "diffuseColor": m.diffuse_color.to_array(),
        "specularColor": m.specular_color.to_array(),
        "ambientColor": m.ambient_color.to_array(),
        "emissiveColor": m.emissive_color.to_array(),
        "shininess": m.shininess,
        "alpha": m.alpha,
    })
}

fn cmd_materials(path: &str) -> Result<()> {
    let package = load(path)?;
    println!("File: {} ({} materials)", path, package.materials.len());
    for (i, m) in package.materials.iter().enumerate() {
        let users: Vec<_> = package
            .nodes
            .iter()
            .filter(|n| n.material == Some(i))
            .map(|n| n.name.as_str())
            .collect();
        println!("  [{}] {} (shader {:?})", i, m.name, m.shader_name);
        for (label, tex) in ["diffuse", "normal", "specular", "override"].iter().zip(m.textures()) {
            if let Some(tex) = tex {
                println!("      {:<9} {}", label, tex);
            }
        }
        println!(
            "      diffuse color {:?}, shininess {}, alpha {}",
            m.diffuse_color.to_array(),
            m.shininess,
            m.alpha
        );
        println!("      used by: {}", users.join(", "));
    }
    Ok(())
}

fn cmd_roundtrip(input: &str, output: &str, big_endian: bool) -> Result<()> {
    let cache = FormatCache::new();
    let original = load_package(input, &cache)?;
    info!(nodes = original.nodes.len(), materials = original.materials.len(), "loaded");

    let endian = if big_endian { Endian::Big } else { Endian::Little };
    save_package(&original, output, &WriteOptions::default().with_endian(endian))?;
    let copy = load_package(output, &cache)?;

    let parents = |p: &Package| p.nodes.iter().map(|n| n.attached_to).collect::<Vec<_>>();
    let counts = |p: &Package| {
        p.nodes
            .iter()
            .map(|n| n.mesh.as_ref().map(|m| (m.vertex_count(), m.indices().len())))
            .collect::<Vec<_>>()
    };
    let used = original.nodes.iter().filter_map(|n| n.material).collect::<std::collections::BTreeSet<_>>();

    println!("Wrote {} ({:?} endian)", output, endian);
    println!("  Nodes:     {} -> {}", original.nodes.len(), copy.nodes.len());
    println!("  Materials: {} -> {}", used.len(), copy.materials.len());
    if parents(&original) != parents(&copy) || counts(&original) != counts(&copy) || used.len() != copy.materials.len()
    {
        return Err(Error::other("re-read package differs from the original"));
    }
    println!("  Round trip OK");
    Ok(())
}

fn load(path: &str) -> Result<Package> {
    info!(path, "opening");
    load_package(path, &FormatCache::new())
}
