/// Double-SHA256 over a batch of short messages, one work item per message.
///
/// Messages are laid out at a fixed stride; all messages in a batch share one
/// length, which after padding must fit a single 64-byte block (len <= 55).
/// The second hash runs over the 32-byte first digest, which also pads to a
/// single block, so both compressions start from the standard IV.
pub const SHA256D_BATCH: &str = r#"
#define ROTRIGHT(word,bits) (((word) >> (bits)) | ((word) << (32-(bits))))
#define CH(x,y,z) (((x) & (y)) ^ (~(x) & (z)))
#define MAJ(x,y,z) (((x) & (y)) ^ ((x) & (z)) ^ ((y) & (z)))
#define EP0(x) (ROTRIGHT(x,2) ^ ROTRIGHT(x,13) ^ ROTRIGHT(x,22))
#define EP1(x) (ROTRIGHT(x,6) ^ ROTRIGHT(x,11) ^ ROTRIGHT(x,25))
#define SIG0(x) (ROTRIGHT(x,7) ^ ROTRIGHT(x,18) ^ ((x) >> 3))
#define SIG1(x) (ROTRIGHT(x,17) ^ ROTRIGHT(x,19) ^ ((x) >> 10))

__constant uint K[64] = {
    0x428a2f98, 0x71374491, 0xb5c0fbcf, 0xe9b5dba5,
    0x3956c25b, 0x59f111f1, 0x923f82a4, 0xab1c5ed5,
    0xd807aa98, 0x12835b01, 0x243185be, 0x550c7dc3,
    0x72be5d74, 0x80deb1fe, 0x9bdc06a7, 0xc19bf174,
    0xe49b69c1, 0xefbe4786, 0x0fc19dc6, 0x240ca1cc,
    0x2de92c6f, 0x4a7484aa, 0x5cb0a9dc, 0x76f988da,
    0x983e5152, 0xa831c66d, 0xb00327c8, 0xbf597fc7,
    0xc6e00bf3, 0xd5a79147, 0x06ca6351, 0x14292967,
    0x27b70a85, 0x2e1b2138, 0x4d2c6dfc, 0x53380d13,
    0x650a7354, 0x766a0abb, 0x81c2c92e, 0x92722c85,
    0xa2bfe8a1, 0xa81a664b, 0xc24b8b70, 0xc76c51a3,
    0xd192e819, 0xd6990624, 0xf40e3585, 0x106aa070,
    0x19a4c116, 0x1e376c08, 0x2748774c, 0x34b0bcb5,
    0x391c0cb3, 0x4ed8aa4a, 0x5b9cca4f, 0x682e6ff3,
    0x748f82ee, 0x78a5636f, 0x84c87814, 0x8cc70208,
    0x90befffa, 0xa4506ceb, 0xbef9a3f7, 0xc67178f2
};

static void sha256_single_block(const uchar *block, uint *state) {
    uint w[64];
    for (int i = 0; i < 16; i++) {
        w[i] = ((uint)block[4*i] << 24) |
               ((uint)block[4*i + 1] << 16) |
               ((uint)block[4*i + 2] << 8) |
               ((uint)block[4*i + 3]);
    }
    for (int i = 16; i < 64; i++) {
        w[i] = SIG1(w[i-2]) + w[i-7] + SIG0(w[i-15]) + w[i-16];
    }

    uint a = 0x6a09e667, b = 0xbb67ae85, c = 0x3c6ef372, d = 0xa54ff53a;
    uint e = 0x510e527f, f = 0x9b05688c, g = 0x1f83d9ab, h = 0x5be0cd19;

    for (int i = 0; i < 64; i++) {
        uint t1 = h + EP1(e) + CH(e,f,g) + K[i] + w[i];
        uint t2 = EP0(a) + MAJ(a,b,c);
        h = g; g = f; f = e;
        e = d + t1;
        d = c; c = b; b = a;
        a = t1 + t2;
    }

    state[0] = 0x6a09e667 + a;
    state[1] = 0xbb67ae85 + b;
    state[2] = 0x3c6ef372 + c;
    state[3] = 0xa54ff53a + d;
    state[4] = 0x510e527f + e;
    state[5] = 0x9b05688c + f;
    state[6] = 0x1f83d9ab + g;
    state[7] = 0x5be0cd19 + h;
}

__kernel void sha256d_batch(__global const uchar* input,
                            __global uchar* output,
                            const uint count,
                            const uint stride,
                            const uint msg_len) {
    uint gid = get_global_id(0);
    if (gid >= count) return;

    uchar block[64];
    for (int i = 0; i < 64; i++) block[i] = 0;
    for (uint i = 0; i < msg_len; i++) block[i] = input[gid * stride + i];
    block[msg_len] = 0x80;
    uint bits = msg_len * 8;
    block[62] = (uchar)(bits >> 8);
    block[63] = (uchar)(bits & 0xff);

    uint h1[8];
    sha256_single_block(block, h1);

    uchar block2[64];
    for (int i = 0; i < 64; i++) block2[i] = 0;
    for (int i = 0; i < 8; i++) {
        block2[4*i]     = (uchar)(h1[i] >> 24);
        block2[4*i + 1] = (uchar)(h1[i] >> 16);
        block2[4*i + 2] = (uchar)(h1[i] >> 8);
        block2[4*i + 3] = (uchar)(h1[i]);
    }
    block2[32] = 0x80;
    block2[62] = 0x01;   // 256 bits
    block2[63] = 0x00;

    uint h2[8];
    sha256_single_block(block2, h2);

    for (int i = 0; i < 8; i++) {
        output[gid * 32 + 4*i]     = (uchar)(h2[i] >> 24);
        output[gid * 32 + 4*i + 1] = (uchar)(h2[i] >> 16);
        output[gid * 32 + 4*i + 2] = (uchar)(h2[i] >> 8);
        output[gid * 32 + 4*i + 3] = (uchar)(h2[i]);
    }
}
"#;
