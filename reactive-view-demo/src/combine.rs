use futures_util::{
    future::{self, Either},
    stream, Stream, StreamExt,
};

/// Prefix `stream` with `None` and wrap its values in `Some`, so consumers
/// get a value right away.
pub(crate) fn prepend_none<S: Stream>(stream: S) -> impl Stream<Item = Option<S::Item>> {
    stream::once(future::ready(None)).chain(stream.map(Some))
}

/// Emit the latest values of both streams whenever either emits, as soon as
/// both emitted at least once.
///
/// Ends when both streams ended.
pub(crate) fn combine_latest<A, B>(
    a: impl Stream<Item = A>,
    b: impl Stream<Item = B>,
) -> impl Stream<Item = (A, B)>
where
    A: Clone,
    B: Clone,
{
    stream::select(a.map(Either::Left), b.map(Either::Right))
        .scan((None, None), |(left, right), next| {
            match next {
                Either::Left(value) => *left = Some(value),
                Either::Right(value) => *right = Some(value),
            }
            future::ready(Some(left.clone().zip(right.clone())))
        })
        .filter_map(future::ready)
}
