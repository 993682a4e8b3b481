use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use frankenterm_mirror::{Display, Emulator, Parser};

fn fnv1a64(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Repeat base patterns to roughly 64 KB for stable throughput numbers.
fn corpora() -> Vec<(&'static str, Vec<u8>)> {
    // Colored compiler output: dense SGR switches with text.
    let sgr_line = b"\x1b[1;32m   Compiling\x1b[0m frankenterm-mirror v0.1.0 \
\x1b[2m(/repo/crates/frankenterm-mirror)\x1b[0m\r\n\
\x1b[1;33mwarning\x1b[0m: unused variable `\x1b[1mx\x1b[0m`\r\n\
 \x1b[1;34m-->\x1b[0m src/lib.rs:42:9\r\n";
    let sgr_stream = sgr_line.repeat(64 * 1024 / sgr_line.len());

    // Full-screen program redrawing with cursor addressing.
    let cursor_line = b"\x1b[1;1H\x1b[2J\x1b[1;1HABCDEFGHIJ\
\x1b[2;1HKLMNOPQRST\x1b[3;1H0123456789\
\x1b[1;5H\x1b[0K\x1b[3;8H\x1b[1P\x1b[2;3H\x1b[2@  ";
    let cursor_stream = cursor_line.repeat(64 * 1024 / cursor_line.len());

    let utf8_line = "你好世界 café résumé, 🦀🔥✅ line of text 日本語テスト e\u{301}\r\n".as_bytes();
    let utf8_stream = utf8_line.repeat(64 * 1024 / utf8_line.len());

    let ascii_line = b"The quick brown fox jumps over the lazy dog. 0123456789 ABCDEF\r\n";
    let ascii_stream = ascii_line.repeat(64 * 1024 / ascii_line.len());

    vec![
        ("sgr_64k_v1", sgr_stream),
        ("cursor_64k_v1", cursor_stream),
        ("utf8_64k_v1", utf8_stream),
        ("ascii_64k_v1", ascii_stream),
    ]
}

fn parser_throughput_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("parser_throughput");
    for (id, bytes) in corpora() {
        eprintln!(
            "[frankenterm-mirror bench] corpus={} bytes={} fnv1a64={:016x}",
            id,
            bytes.len(),
            fnv1a64(&bytes)
        );
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("process", id), &bytes, |b, bytes| {
            let mut parser = Parser::new();
            b.iter(|| {
                let handlers = parser.process(black_box(bytes));
                black_box(handlers.len());
            });
        });

        group.bench_with_input(BenchmarkId::new("emulate", id), &bytes, |b, bytes| {
            let mut emu = Emulator::new(120, 40, 1_000);
            b.iter(|| {
                emu.handle_stream(black_box(bytes));
                black_box(emu.cursor_row());
            });
        });
    }
    group.finish();
}

/// A host screen full of text, and the same screen after `edit`.
fn frame_pair(edit: &[u8]) -> (Emulator, Emulator) {
    let mut before = Emulator::new(120, 40, 0);
    for i in 0..40 {
        let line = format!("\x1b[{};1H\x1b[3{}mrow {i:02} {}", i + 1, i % 8, "lorem ipsum ".repeat(9));
        before.handle_stream(line.as_bytes());
    }
    let mut after = before.clone();
    after.handle_stream(edit);
    (before, after)
}

fn display_diff_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("display_diff");
    let display = Display::default();
    let cases: [(&str, &[u8]); 4] = [
        ("unchanged", b""),
        ("cursor_move", b"\x1b[20;40H"),
        ("one_cell", b"\x1b[10;10H\x1b[1mX"),
        ("scroll_one", b"\x1b[40;1H\r\nnew last line"),
    ];
    for (id, edit) in cases {
        let (before, after) = frame_pair(edit);
        let out = display.new_frame(true, &before, &after);
        eprintln!("[frankenterm-mirror bench] diff={} out_bytes={}", id, out.len());
        group.bench_function(BenchmarkId::new("new_frame", id), |b| {
            b.iter(|| {
                let out = display.new_frame(true, black_box(&before), black_box(&after));
                black_box(out.len());
            });
        });
    }

    let (_, full) = frame_pair(b"");
    let blank = Emulator::new(120, 40, 0);
    group.bench_function(BenchmarkId::new("new_frame", "full_repaint"), |b| {
        b.iter(|| {
            let out = display.new_frame(false, black_box(&blank), black_box(&full));
            black_box(out.len());
        });
    });
    group.finish();
}

criterion_group!(benches, parser_throughput_bench, display_diff_bench);
criterion_main!(benches);
