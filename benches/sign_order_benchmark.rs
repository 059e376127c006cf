use airswap_rust::{
    keypair::Keypair,
    order::{recover_order_signer, sign_order, Order},
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_order(keypair: &Keypair) -> Order {
    Order {
        maker_address: keypair.address().to_string(),
        maker_amount: String::from("100"),
        maker_token: String::from("0x27054b13b1b798b345b591a4d22e6562d47ea75a"),
        taker_address: String::from("0x00000000000000000000000000000000000000bb"),
        taker_amount: String::from("100000"),
        taker_token: String::from("0x0000000000000000000000000000000000000000"),
        nonce: String::from("8675309"),
        expiration: 1700000000,
    }
}

fn bench_hash_order(c: &mut Criterion) {
    let order = bench_order(&Keypair::new());
    c.bench_function("order hash", |b| b.iter(|| black_box(&order).hash()));
}

fn bench_sign_order(c: &mut Criterion) {
    let keypair = Keypair::new();
    let order = bench_order(&keypair);
    c.bench_function("sign order", |b| {
        b.iter(|| sign_order(black_box(order.clone()), &keypair))
    });
}

fn bench_recover_signer(c: &mut Criterion) {
    let keypair = Keypair::new();
    let signed = sign_order(bench_order(&keypair), &keypair).unwrap();
    c.bench_function("recover order signer", |b| {
        b.iter(|| recover_order_signer(black_box(&signed)))
    });
}

criterion_group!(benches, bench_hash_order, bench_sign_order, bench_recover_signer);
criterion_main!(benches);
