//! Heartbeat processing pipeline.
//!
//! A [`Handle`] takes a whole batch of heartbeats and returns one
//! [`SendResult`] per delivered heartbeat. Stages are [`HandleOption`]s:
//! each one wraps the next handle and decides whether to call it.

use crate::heartbeat::{HeartBeat, SendResult};
use anyhow::Result;

pub type Handle<'a> = Box<dyn FnMut(Vec<HeartBeat>) -> Result<Vec<SendResult>> + 'a>;

pub type HandleOption<'a> = Box<dyn FnOnce(Handle<'a>) -> Handle<'a> + 'a>;

/// Terminal collaborator of the pipeline. Retrying and queueing are up to
/// the implementation.
pub trait Sender {
    fn send(&mut self, heartbeats: Vec<HeartBeat>) -> Result<Vec<SendResult>>;
}

impl<S: Sender + ?Sized> Sender for &mut S {
    fn send(&mut self, heartbeats: Vec<HeartBeat>) -> Result<Vec<SendResult>> {
        (**self).send(heartbeats)
    }
}

/// Wraps `sender` with `opts`. The first option is the outermost one and sees
/// the batch first.
pub fn new_handle<'a, S>(mut sender: S, opts: Vec<HandleOption<'a>>) -> Handle<'a>
where
    S: Sender + 'a,
{
    let terminal: Handle<'a> = Box::new(move |hh: Vec<HeartBeat>| sender.send(hh));

    opts.into_iter().rev().fold(terminal, |next, opt| opt(next))
}
