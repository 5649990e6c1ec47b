#[cfg(test)]
mod tests {
    use promise_loop::{map2, EmbeddedWorker, Flatten, Future, SharedWorker, WorkerExt};

    fn worker() -> SharedWorker {
        EmbeddedWorker::new()
    }

    #[test]
    fn test_variadic_map() {
        let worker = worker();
        let future_a = worker.submit(|| Ok::<_, String>("a"));
        let future_b = worker.submit(|| Ok::<_, String>("b"));
        let future_ab = map2(&future_a, &future_b, |a, b| format!("{a}{b}"));
        assert_eq!(future_ab.wait(), Ok("ab".to_string()));
    }

    #[test]
    fn test_flatten() {
        let worker = EmbeddedWorker::new();
        let a = worker.new_promise::<String, String>();
        let b = worker.new_promise::<String, String>();
        let arr = vec![a.future(), b.future()];
        let flat = arr.flatten(&worker);
        a.succeed("a".into());
        b.succeed("b".into());
        assert_eq!(flat.wait(), Ok(vec!["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn test_flatten_stack_overflow() {
        let worker = EmbeddedWorker::new();
        let count = 1 << 12;
        let arr: Vec<Future<usize, String>> = (0..count).map(|i| worker.succeeded(i)).collect();
        let flat = arr.flatten(&worker).wait().unwrap();
        assert_eq!(flat.len(), count);
        assert_eq!(flat, (0..count).collect::<Vec<_>>());
    }

    #[test]
    fn test_flatten_large_on_a_small_stack() {
        // Far too little stack for one frame per input.
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let worker = EmbeddedWorker::new();
                let arr: Vec<Future<usize, String>> =
                    (0..1 << 14).map(|i| worker.succeeded(i)).collect();
                arr.flatten(&worker).wait().map(|v| v.len())
            })
            .unwrap();
        assert_eq!(handle.join().expect("The flatten thread has panicked"), Ok(1 << 14));
    }

    #[test]
    fn test_flatten_fail() {
        let worker = EmbeddedWorker::new();
        let a = worker.new_promise::<String, String>();
        let b = worker.new_promise::<String, String>();
        let arr = vec![a.future(), b.future()];
        a.succeed("a".into());
        b.fail("b".into());
        assert_eq!(arr.flatten(&worker).wait(), Err("b".to_string()));
    }

    #[test]
    fn test_flatten_empty() {
        let worker = EmbeddedWorker::new();
        let arr: Vec<Future<String, String>> = vec![];
        assert_eq!(arr.flatten(&worker).wait().map(|v| v.len()), Ok(0));
    }

    #[test]
    fn test_transform() {
        let worker = worker();
        let future = worker.submit(|| Ok::<_, String>(1));
        let transformed = future.transform("a");
        assert_eq!(transformed.wait(), Ok("a"));
    }

    #[test]
    fn test_transform_always() {
        let worker = EmbeddedWorker::new();
        let a = worker.new_promise::<String, String>();
        let b = worker.new_promise::<String, String>();
        let future_a = a.future();
        let future_b = b.future();
        a.succeed("a".into());
        b.fail("b".into());
        let transform_succeed = future_a.transform_always(1).wait();
        let transform_fail = future_b.transform_always(1).wait();
        assert_eq!(transform_succeed, transform_fail);
        assert_eq!(transform_succeed, Ok(1));
    }

    #[test]
    fn test_long_map_chain() {
        let worker = EmbeddedWorker::new();
        let mut future = worker.succeeded::<u64, String>(0);
        for _ in 0..10_000 {
            future = future.map(|v| v + 1);
        }
        assert_eq!(future.wait(), Ok(10_000));
    }

    #[test]
    fn test_dropping_a_long_pending_chain_on_a_small_stack() {
        // Every link owns the next through its observer; none ever completes.
        let handle = std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let worker = EmbeddedWorker::new();
                let promise = worker.new_promise::<u64, String>();
                let mut future = promise.future();
                for _ in 0..100_000 {
                    future = future.map(|v| v + 1);
                }
                let tail = future.clone();
                drop(future);
                drop(promise);
                tail.is_complete()
            })
            .unwrap();
        assert!(!handle.join().expect("The dropping thread has panicked"));
    }
}
