use burnlink_crypto::{decrypt_payload, encrypt_payload, FullKey, PayloadKind, PublicComponent};
use rand::rngs::OsRng;

fn make_data(size: usize) -> Vec<u8> {
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

fn bench_key() -> FullKey {
    FullKey::compose(&PublicComponent::from_bytes([0xABu8; 32]), None)
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_encrypt_payload(bencher: divan::Bencher, size: usize) {
    let key = bench_key();
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            encrypt_payload(
                divan::black_box(&key),
                PayloadKind::Files,
                divan::black_box(&data),
                &mut OsRng,
            )
            .unwrap()
        });
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn bench_decrypt_payload(bencher: divan::Bencher, size: usize) {
    let key = bench_key();
    let data = make_data(size);
    let encrypted = encrypt_payload(&key, PayloadKind::Files, &data, &mut OsRng).unwrap();
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            decrypt_payload(
                divan::black_box(&key),
                PayloadKind::Files,
                divan::black_box(&encrypted),
            )
            .unwrap()
        });
}

fn main() {
    divan::main();
}
