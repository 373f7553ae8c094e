//! Extraction benchmarks: tokenizer throughput and the Spring controller parser.

use std::path::Path;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use routemap_analysis::frameworks::spring::parse_controller;
use routemap_analysis::frameworks::ExtractionContext;
use routemap_analysis::scanner::types::SourceFile;
use routemap_analysis::tokenizer::cache::TokenCache;
use routemap_analysis::tokenizer::{Tokenizer, TokenizerOptions};

fn controller_source(methods: usize) -> String {
    let mut source = String::from(
        "package bench;\n\n@RestController\n@RequestMapping(\"/api/items\")\npublic class ItemController {\n",
    );
    for i in 0..methods {
        source.push_str(&format!(
            "    @GetMapping(\"/{i}/{{id}}\")\n    public Item get{i}(@PathVariable Long id, @RequestParam(defaultValue = \"10\") int size) {{\n        if (id > 0) {{ return service.find(id); }}\n        return null;\n    }}\n\n"
        ));
    }
    source.push_str("}\n");
    source
}

fn tokenizer_benchmark(c: &mut Criterion) {
    let source = controller_source(200);
    let mut group = c.benchmark_group("tokenizer");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("java_200_methods", |b| {
        b.iter(|| Tokenizer::tokenize(std::hint::black_box(&source), TokenizerOptions::JAVA))
    });
    group.finish();
}

fn spring_parser_benchmark(c: &mut Criterion) {
    let source = controller_source(200);
    let root = Path::new("/bench");
    let file = SourceFile::new(root, &root.join("ItemController.java"), source.len() as u64)
        .expect("java source file");
    let ctx = ExtractionContext::new(root);
    c.bench_function("spring_parse_200_methods", |b| {
        b.iter(|| parse_controller(&file, std::hint::black_box(&source), &ctx))
    });

    let cache = TokenCache::new(16);
    let cached = ExtractionContext::new(root).with_token_cache(&cache);
    c.bench_function("spring_parse_200_methods_cached_tokens", |b| {
        b.iter(|| parse_controller(&file, std::hint::black_box(&source), &cached))
    });
}

criterion_group!(benches, tokenizer_benchmark, spring_parser_benchmark);
criterion_main!(benches);
