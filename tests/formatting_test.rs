mod common;

use std::sync::Arc;

use common::*;
use predial::format::{pad_left, NumberLocale, TAXPAYER_CODE_WIDTH};
use predial::pdf::{PageSettings, PdfDocument};
use predial::{helvetica, FormCode, FormRequest, MissPolicy};
use rand::Rng;
use unicode_normalization::UnicodeNormalization as _;

#[test]
fn formatted_amounts_parse_back_to_the_rounded_value() {
    let mut rng = rand::thread_rng();
    let locales = [
        NumberLocale::default(),
        NumberLocale {
            thousands_separator: '.',
            decimal_separator: ',',
        },
    ];

    for _ in 0..2000 {
        let amount = rng.gen_range(-10_000_000.0..10_000_000.0_f64);
        for locale in &locales {
            let formatted = locale.format_amount(amount);
            let decimals = formatted
                .rsplit_once(locale.decimal_separator)
                .map(|(_, decimals)| decimals.len());
            assert_eq!(decimals, Some(2), "{}", formatted);

            let parsed = locale.parse_amount(&formatted).unwrap();
            assert!((parsed - amount).abs() <= 0.005 + 1e-6, "{} -> {}", amount, formatted);
        }
    }
}

#[test]
fn padded_codes_keep_their_digits() {
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let code = rng.gen_range(0..10_000_000_000_u64).to_string();
        let padded = pad_left(&code, TAXPAYER_CODE_WIDTH, '0');
        assert_eq!(padded.len(), TAXPAYER_CODE_WIDTH);
        assert_eq!(padded.parse::<u64>().unwrap().to_string(), code);
    }
}

#[test]
fn random_text_is_always_encodable() {
    let mut rng = rand::thread_rng();
    for _ in 0..300 {
        let length = rng.gen_range(1..64);
        let text = rand_utf8::rand_utf8(&mut rng, length).to_string();

        let encoded = helvetica::encode(&text);
        assert_eq!(encoded.len(), text.nfc().count());
        assert!(helvetica::string_unit_width(&text) >= 0.0);

        let mut pdf_document = PdfDocument::new("fuzz".into(), PageSettings::default());
        pdf_document.text(&text, 10.0, 10.0).unwrap();
        let bytes = pdf_document.save_to_bytes().unwrap();
        let pages = page_contents(&bytes);
        assert_eq!(pages[0].texts, vec![decode_win_ansi(&encoded)]);
    }
}

#[tokio::test]
async fn liquidation_amounts_survive_the_document() {
    let mut rng = rand::thread_rng();
    let assembler = assembler_over(Arc::new(MemoryTransport::new()), MissPolicy::Remember);
    let locale = NumberLocale::default();

    for _ in 0..20 {
        let mut record = sample_record();
        let assessed_cents = rng.gen_range(0..1_000_000_000_i64);
        let taxable_cents = rng.gen_range(0..=assessed_cents);
        record.supplementary.assessed_value = assessed_cents as f64 / 100.0;
        record.total_taxable_value = taxable_cents as f64 / 100.0;

        let generated_document = assembler
            .generate_complete(&FormRequest::new([FormCode::Hlp]), &record, JURISDICTION, PERIOD)
            .await
            .unwrap();
        let texts = &page_contents(&generated_document.bytes)[0].texts;

        // Watermark, document, name, code, count twice, then the three amounts
        let amounts: Vec<f64> = texts[texts.len() - 3..]
            .iter()
            .map(|text| locale.parse_amount(text).unwrap())
            .collect();
        let expected = [assessed_cents, assessed_cents - taxable_cents, taxable_cents];
        for (amount, cents) in amounts.iter().zip(expected) {
            assert_eq!((amount * 100.0).round() as i64, cents, "{:?}", texts);
        }
    }
}
