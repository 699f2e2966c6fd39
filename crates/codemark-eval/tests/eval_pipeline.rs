//! Full pipeline test: watermark a toy corpus, score both corpora through
//! the parallel runner, and check the ROC artifacts end to end.

use codemark_core::{CorpusLabel, SchemeId, WatermarkConfig};
use codemark_eval::{
    append_summary_row, detect_corpus, population, write_metrics_file, EvaluationRecord,
    RocMetrics, SweepRow, TokenizedDocument,
};
use codemark_watermark::{shannon_entropy, softmax, Detector, WatermarkSampler};
use rand::distributions::{Distribution, WeightedIndex};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const VOCAB: usize = 64;
const DOC_LEN: usize = 60;
const CORPUS_SIZE: usize = 30;

fn toy_logits(context: &[u32]) -> Vec<f32> {
    let mut state: u64 = 0x5bd1_e995;
    for &token in context.iter().rev().take(4) {
        state = state
            .wrapping_mul(0x0100_0000_01b3)
            .wrapping_add(u64::from(token));
    }
    (0..VOCAB)
        .map(|token| {
            let mut h = state ^ (token as u64).wrapping_mul(0x9e37_79b9);
            h ^= h >> 17;
            h = h.wrapping_mul(0xc2b2_ae3d_27d4_eb4f);
            ((h % 1000) as f32) / 500.0
        })
        .collect()
}

fn config() -> WatermarkConfig {
    WatermarkConfig::new(SchemeId::Rolling3)
        .with_gamma(0.25)
        .with_delta(3.0)
        .with_entropy_threshold(1.2)
}

fn make_document(id: u64, sampler: Option<&WatermarkSampler>) -> TokenizedDocument {
    let mut rng = ChaCha8Rng::seed_from_u64(id);
    let mut tokens: Vec<u32> = vec![
        (id % VOCAB as u64) as u32,
        ((id / 7) % VOCAB as u64) as u32,
        ((id / 13) % VOCAB as u64) as u32,
    ];
    while tokens.len() < DOC_LEN {
        let mut logits = toy_logits(&tokens);
        if let Some(sampler) = sampler {
            sampler.step(&tokens, &mut logits).unwrap();
        }
        let probs = softmax(&logits);
        let next = WeightedIndex::new(&probs).unwrap().sample(&mut rng) as u32;
        tokens.push(next);
    }
    let entropies = (0..tokens.len())
        .map(|i| shannon_entropy(&softmax(&toy_logits(&tokens[..i]))))
        .collect();
    TokenizedDocument {
        id: format!("doc-{id}"),
        tokens,
        entropies,
    }
}

#[test]
fn watermarked_corpus_scores_near_perfect_roc() {
    let sampler = WatermarkSampler::new(config(), VOCAB).unwrap();
    let detector = Detector::new(config(), VOCAB).unwrap();

    let machine_docs: Vec<TokenizedDocument> = (0..CORPUS_SIZE as u64)
        .map(|i| make_document(2000 + i, Some(&sampler)))
        .collect();
    let human_docs: Vec<TokenizedDocument> = (0..CORPUS_SIZE as u64)
        .map(|i| make_document(3000 + i, None))
        .collect();

    let machine_scores = detect_corpus(&detector, &machine_docs, 4);
    let human_scores = detect_corpus(&detector, &human_docs, 4);

    let machine = population(CorpusLabel::Machine, &machine_scores);
    let human = population(CorpusLabel::Human, &human_scores);
    assert_eq!(machine.len(), CORPUS_SIZE);
    assert_eq!(human.len(), CORPUS_SIZE);

    let metrics = RocMetrics::compute(&human, &machine);
    assert!(metrics.auroc > 0.95, "auroc too low: {}", metrics.auroc);
    assert!(
        metrics.tpr_at_5 > 0.9,
        "tpr@5% too low: {}",
        metrics.tpr_at_5
    );

    // Artifacts round-trip through the output directory.
    let dir = tempfile::tempdir().unwrap();
    let record = EvaluationRecord::new(
        config(),
        VOCAB,
        0.0,
        &human,
        &machine,
        metrics,
        human_scores,
        machine_scores,
    );
    let record_path = record.write_json(dir.path()).unwrap();
    let restored = EvaluationRecord::read_json(&record_path).unwrap();
    assert_eq!(restored.id, record.id);
    assert_eq!(restored.machine_documents.len(), CORPUS_SIZE);

    write_metrics_file(&dir.path().join("metrics.txt"), &metrics).unwrap();
    append_summary_row(
        &dir.path().join("summary.md"),
        &SweepRow {
            method: SchemeId::Rolling3.to_string(),
            ratio: 0.0,
            metrics,
        },
    )
    .unwrap();

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.contains("rolling_3"));
}

#[test]
fn detection_rate_degrades_under_wrong_key() {
    let sampler = WatermarkSampler::new(config(), VOCAB).unwrap();
    let right = Detector::new(config(), VOCAB).unwrap();
    let wrong = Detector::new(config().with_secret_key(0xdead_beef), VOCAB).unwrap();

    let docs: Vec<TokenizedDocument> = (0..CORPUS_SIZE as u64)
        .map(|i| make_document(5000 + i, Some(&sampler)))
        .collect();
    let human_docs: Vec<TokenizedDocument> = (0..CORPUS_SIZE as u64)
        .map(|i| make_document(6000 + i, None))
        .collect();

    let human = population(CorpusLabel::Human, &detect_corpus(&right, &human_docs, 4));

    let right_metrics = RocMetrics::compute(
        &human,
        &population(CorpusLabel::Machine, &detect_corpus(&right, &docs, 4)),
    );
    let wrong_metrics = RocMetrics::compute(
        &human,
        &population(CorpusLabel::Machine, &detect_corpus(&wrong, &docs, 4)),
    );

    assert!(right_metrics.auroc > 0.95);
    assert!(
        wrong_metrics.auroc < 0.75,
        "wrong key should look near chance, got {}",
        wrong_metrics.auroc
    );
}
