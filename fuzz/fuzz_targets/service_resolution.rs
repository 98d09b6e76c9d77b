#![no_main]

use ferrous_inject::{Container, Context, DiError, Factory, Param, Resolver, Scope};
use libfuzzer_sys::fuzz_target;

struct Node<const I: usize>;

const NODES: usize = 4;

fn scope_of(byte: u8) -> Scope {
    match byte % 3 {
        0 => Scope::Singleton,
        1 => Scope::Dependent,
        _ => Scope::Transient,
    }
}

fn param(target: usize) -> Param {
    match target {
        0 => Param::of::<Node<0>>("n0"),
        1 => Param::of::<Node<1>>("n1"),
        2 => Param::of::<Node<2>>("n2"),
        _ => Param::of::<Node<3>>("n3"),
    }
}

fn node<const I: usize>(edges: u8) -> Factory {
    let mut builder = Factory::function("node");
    for target in (0..NODES).filter(|t| edges & (1 << t) != 0) {
        builder = builder.param(param(target));
    }
    builder.build_blocking(|_| Ok(Node::<I>))
}

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 * NODES + 1 {
        return;
    }

    let container = Container::new();
    let (scopes, edges) = data.split_at(NODES);
    container.register(node::<0>(edges[0]), scope_of(scopes[0])).unwrap();
    container.register(node::<1>(edges[1]), scope_of(scopes[1])).unwrap();
    container.register(node::<2>(edges[2]), scope_of(scopes[2])).unwrap();
    container.register(node::<3>(edges[3]), scope_of(scopes[3])).unwrap();

    let with_context = data[2 * NODES] & 1 == 1;
    let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
    rt.block_on(async {
        let context = Context::new();
        let outcome = match (data[2 * NODES] >> 1) % NODES as u8 {
            0 if with_context => container.in_context(&context).get::<Node<0>>().await.map(drop),
            0 => container.get::<Node<0>>().await.map(drop),
            1 if with_context => container.in_context(&context).get::<Node<1>>().await.map(drop),
            1 => container.get::<Node<1>>().await.map(drop),
            2 if with_context => container.in_context(&context).get::<Node<2>>().await.map(drop),
            2 => container.get::<Node<2>>().await.map(drop),
            _ if with_context => container.in_context(&context).get::<Node<3>>().await.map(drop),
            _ => container.get::<Node<3>>().await.map(drop),
        };

        // Any graph over registered nodes fails only on its shape.
        match outcome {
            Ok(())
            | Err(DiError::InvalidScope { .. })
            | Err(DiError::DependencyLoop(_))
            | Err(DiError::MissingContext(_)) => {}
            Err(other) => panic!("unexpected resolution error: {other}"),
        }
    });
});
