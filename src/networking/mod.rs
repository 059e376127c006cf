/*!

# Relay Protocol

## Introduction

Peers never talk to each other directly. Every peer keeps one websocket open
to the relay, and the relay forwards frames between peers by address.

All frames are text.

## Authentication

The first frames on a new connection are not JSON.

```text
relay  -> peer   <challenge>
peer   -> relay  0x<r><s><v>
relay  -> peer   ok | not authorized
```

The challenge is signed as an Ethereum personal message with the peer's key;
`v` is the recovery id plus 27, written as two hex digits. Once the relay
answers `ok`, every frame in either direction is an envelope.

## Envelope

```json
{
  "sender": "0x<our address>",
  "receiver": "0x<peer or indexer address>",
  "message": "<serialized JSON-RPC 2.0 message>",
  "id": 1540000000000
}
```

The envelope `id` belongs to the relay. Calls are matched to their responses
by the `id` of the inner message.

## Methods

The indexer answers at the zero address.

```text
findIntents  {makerTokens, takerTokens, role}   -> [intent]
setIntents   {address, intents}                 -> status
getOrder     {makerToken, takerToken, takerAddress, makerAmount} -> signed order
```

`getOrder` is served by makers. Any other method a peer wishes to answer can
be registered on the session.

*/
pub mod auth;
pub mod calls;
pub mod dispatch;
pub mod envelope;
pub mod rpc;
pub mod session;
pub mod transport;
