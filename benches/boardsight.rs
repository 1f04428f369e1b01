use boardsight::{
    run_cycle, BoardGeometry, BoardState, Calibration, DetectionConfig, Frame, MaskRect,
    MatchConfig, Matcher, PreprocessOptions, ScaleSet, SearchRegion, Template, TemplateCache,
};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as u8);
        }
    }
    data
}

fn extract_patch(
    image: &[u8],
    img_width: usize,
    x0: usize,
    y0: usize,
    width: usize,
    height: usize,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = (y0 + y) * img_width;
        out.extend_from_slice(&image[row + x0..row + x0 + width]);
    }
    out
}

fn icon_cache(image: &[u8], img_width: usize, preprocess: PreprocessOptions) -> TemplateCache {
    let templates = [("archer", 40, 60), ("knight", 200, 90), ("pekka", 330, 150)]
        .into_iter()
        .map(|(id, x, y)| Template::new(id, extract_patch(image, img_width, x, y, 48, 48), 48, 48))
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    TemplateCache::from_templates(
        templates,
        ScaleSet::new(vec![0.8, 0.9, 1.0, 1.1, 1.2]).unwrap(),
        preprocess,
    )
    .unwrap()
}

fn bench_matcher(c: &mut Criterion) {
    let (img_width, img_height) = (512, 288);
    let image = make_image(img_width, img_height);
    let frame = Frame::gray(&image, img_width, img_height);

    let cache = icon_cache(&image, img_width, PreprocessOptions::default());
    let matcher = Matcher::new(&cache).with_config(MatchConfig {
        max_region_fraction: 0.9,
        ..MatchConfig::default()
    });
    c.bench_function("match_region_unmasked", |b| {
        b.iter(|| black_box(matcher.match_region(&frame, &SearchRegion::FULL).unwrap()));
    });

    let masked = icon_cache(
        &image,
        img_width,
        PreprocessOptions {
            mask: Some(MaskRect::top_right(0.3)),
            ..PreprocessOptions::default()
        },
    );
    let matcher_masked = Matcher::new(&masked);
    c.bench_function("match_region_masked", |b| {
        b.iter(|| black_box(matcher_masked.match_region(&frame, &SearchRegion::FULL).unwrap()));
    });

    if cfg!(feature = "rayon") {
        let matcher_par = Matcher::new(&cache).with_config(MatchConfig {
            max_region_fraction: 0.9,
            parallel: true,
            ..MatchConfig::default()
        });
        c.bench_function("match_region_unmasked_parallel", |b| {
            b.iter(|| black_box(matcher_par.match_region(&frame, &SearchRegion::FULL).unwrap()));
        });
    }

    let board = SearchRegion::FULL.resolve(img_width, img_height).unwrap();
    let geometry = BoardGeometry::build(
        board,
        &Calibration {
            origin: boardsight::CalibrationOrigin::BoardRelative,
            row_y: [18.0, 54.0, 90.0, 126.0, 162.0, 198.0, 234.0, 270.0],
            x_start_even: 90.0,
            x_start_odd: 40.0,
            spacing: 100.0,
            ..Calibration::default()
        },
    )
    .unwrap();
    let cfg = DetectionConfig {
        region: SearchRegion::FULL,
        ..DetectionConfig::field_board()
    };
    let mut state = BoardState::new(&geometry);
    c.bench_function("run_cycle_field_board", |b| {
        b.iter(|| black_box(run_cycle(&frame, &cache, &geometry, &mut state, &cfg).unwrap()));
    });
}

criterion_group!(benches, bench_matcher);
criterion_main!(benches);
