use promise_loop::{join_all, map3, EmbeddedWorker, WorkerExt};
use proptest::prelude::*;

/// Outcomes for each input, plus the order in which the inputs get settled.
fn outcomes_and_order() -> impl Strategy<Value = (Vec<Result<i32, String>>, Vec<usize>)> {
    prop::collection::vec(
        prop_oneof![
            3 => any::<i32>().prop_map(Ok::<i32, String>),
            1 => "[a-z]{1,4}".prop_map(Err::<i32, String>),
        ],
        0..64,
    )
    .prop_flat_map(|outcomes| {
        let order: Vec<usize> = (0..outcomes.len()).collect();
        (Just(outcomes), Just(order).prop_shuffle())
    })
}

proptest! {
    #[test]
    fn succeeded_and_failed_wait_to_their_payload(value: i64, error in ".*") {
        let worker = EmbeddedWorker::new();
        prop_assert_eq!(worker.succeeded::<_, String>(value).wait(), Ok(value));
        prop_assert_eq!(worker.failed::<i64, _>(error.clone()).wait(), Err(error));
    }

    #[test]
    fn flatten_is_order_preserving_and_lowest_failure_wins(
        input in outcomes_and_order()
    ) {
        let (outcomes, order) = input;
        let worker = EmbeddedWorker::new();
        let promises: Vec<_> = outcomes.iter().map(|_| worker.new_promise::<i32, String>()).collect();
        let flat = join_all(promises.iter().map(|p| p.future()), &worker);
        for index in order {
            promises[index].complete(outcomes[index].clone());
        }

        let expected = match outcomes.iter().find_map(|o| o.clone().err()) {
            Some(error) => Err(error),
            None => Ok(outcomes.iter().filter_map(|o| o.clone().ok()).collect::<Vec<_>>()),
        };
        prop_assert_eq!(flat.wait(), expected);
    }

    #[test]
    fn transform_always_ignores_the_outcome(outcome in prop_oneof![
        any::<u8>().prop_map(Ok::<u8, String>),
        ".*".prop_map(Err::<u8, String>),
    ], constant: u16) {
        let worker = EmbeddedWorker::new();
        let promise = worker.new_promise::<u8, String>();
        let always = promise.future().transform_always(constant);
        promise.complete(outcome);
        prop_assert_eq!(always.wait(), Ok(constant));
    }

    #[test]
    fn variadic_map_is_independent_of_settle_order(
        values in any::<(u8, u8, u8)>(),
        order in Just(vec![0usize, 1, 2]).prop_shuffle()
    ) {
        let worker = EmbeddedWorker::new();
        let promises: Vec<_> = (0..3).map(|_| worker.new_promise::<u8, String>()).collect();
        let combined = map3(
            &promises[0].future(),
            &promises[1].future(),
            &promises[2].future(),
            |a, b, c| vec![a, b, c],
        );
        let values = [values.0, values.1, values.2];
        for index in order {
            promises[index].succeed(values[index]);
        }
        prop_assert_eq!(combined.wait(), Ok(values.to_vec()));
    }
}
