use std::sync::Arc;

use crate::core::message::Message;

/// Transport boundary.
///
/// Returns `true` only when the message was accepted for delivery. The call
/// may block; it must be safe to invoke from several threads at once.
pub trait MessageChannel<P>: Send + Sync {
    fn send(&self, message: &Message<P>) -> bool;
}

impl<P, C> MessageChannel<P> for &C
where
    C: MessageChannel<P> + ?Sized,
{
    fn send(&self, message: &Message<P>) -> bool {
        (**self).send(message)
    }
}

impl<P, C> MessageChannel<P> for Arc<C>
where
    C: MessageChannel<P> + ?Sized,
{
    fn send(&self, message: &Message<P>) -> bool {
        (**self).send(message)
    }
}

impl<P, C> MessageChannel<P> for Box<C>
where
    C: MessageChannel<P> + ?Sized,
{
    fn send(&self, message: &Message<P>) -> bool {
        (**self).send(message)
    }
}
